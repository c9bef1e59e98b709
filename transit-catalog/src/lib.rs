pub mod fleet;
pub mod ledger;

pub use fleet::{FleetError, FleetService};
pub use ledger::{LedgerError, TripLedger};
