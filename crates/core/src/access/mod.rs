pub mod dashboard;
pub mod table;

pub use dashboard::{DASHBOARD_ROOT, DashboardRoutes};
pub use table::{RouteAccessRule, RouteAccessTable};
