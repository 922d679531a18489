/// 抓取油價並依策略寫入歷史檔
pub mod fuel_price;
