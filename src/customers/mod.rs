//! Customer screens: overview list, detail page and section editing.

pub mod detail;
pub mod list;
pub mod update;

pub use detail::{load_overview, CustomerOverview};
pub use list::{CustomerList, StatusBreakdown};
pub use update::CustomerUpdate;
