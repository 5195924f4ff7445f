//! # Machine Configuration & Constants
//!
//! Every magic number in VENDO lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.

// ---------------------------------------------------------------------------
// Coin Handling
// ---------------------------------------------------------------------------

/// The single coin denomination the machine accepts, in coin units.
///
/// The coin slot is physically cut for one denomination. Anything else
/// falls straight through to the return tray — the core treats other
/// values as no-ops, and the HTTP layer rejects them before they get here.
pub const ACCEPTED_COIN: u64 = 1;

// ---------------------------------------------------------------------------
// Service Defaults
// ---------------------------------------------------------------------------

/// Default port for the customer-facing HTTP API.
pub const DEFAULT_API_PORT: u16 = 8000;

/// Default port for the Prometheus metrics endpoint. 9464 is the
/// OpenMetrics convention, so scrapers find it without extra config.
pub const DEFAULT_METRICS_PORT: u16 = 9464;

/// Default filename for the inventory snapshot, relative to the working
/// directory unless an absolute path is configured.
pub const DEFAULT_INVENTORY_FILE: &str = "beverages.json";

/// Machine firmware version string, assembled at compile time so we don't
/// allocate for something this trivial at runtime.
pub const MACHINE_VERSION: &str = "0.1.0";
