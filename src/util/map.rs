use hashbrown::HashMap;

/// 可作為索引鍵的資料
pub trait Keyable {
    fn key(&self) -> String;
}

/// Indexes entities by key. When keys repeat, the entity that comes later
/// in the input wins.
pub fn vec_to_hashmap<T: Keyable>(entities: Vec<T>) -> HashMap<String, T> {
    let mut map = HashMap::with_capacity(entities.len());
    for e in entities {
        map.insert(e.key(), e);
    }
    map
}
