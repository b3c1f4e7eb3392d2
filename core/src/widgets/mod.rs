// Concrete widget pipelines built from the reusable stages in `pipeline`

pub mod commodity;
pub mod daily_due_in;
pub mod outstanding_orders;
pub mod sales;
pub mod top_products;

pub use commodity::{CommodityPoint, CommoditySeries};
pub use daily_due_in::{DailyDueInConfig, DailyDueInPipeline};
pub use outstanding_orders::OutstandingOrdersPipeline;
pub use sales::{monthly_totals, sales_trend, year_over_year, MonthComparison, MonthTotal, SalesTrend};
pub use top_products::{top_products, ProductTotal};
