//! Report services for the Store Inventory Valuation Platform

pub mod cost;
pub mod profit;
pub mod purchases;
pub mod stock;
pub mod usage;

pub use cost::CostReportService;
pub use profit::ProfitService;
pub use purchases::PurchaseReportService;
pub use stock::StockService;
pub use usage::UsageReportService;
