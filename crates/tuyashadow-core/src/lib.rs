// tuyashadow-core: Periodic polling of Tuya device shadows.
//
// The `Poller` fetches every configured device concurrently on a fixed
// schedule, drops devices whose fetch failed, and publishes the cycle's
// results as one immutable `Snapshot`. Hosts read values and scaled
// readings from the latest snapshot or subscribe to publications.

pub mod config;
pub mod error;
pub mod poller;
pub mod sensor;
pub mod snapshot;
pub mod source;
pub mod value;

pub use config::{DEFAULT_POLL_INTERVAL, DataPointConfig, DeviceConfig, PollerConfig};
pub use error::CoreError;
pub use poller::{PollState, Poller};
pub use sensor::{Sensor, sensors_for};
pub use snapshot::{DeviceProperties, Snapshot, SnapshotStore};
pub use source::ShadowSource;
pub use value::{RawValue, Reading};

// Re-exported so hosts need only one dependency for the common types.
pub use tuyashadow_api::{Credentials, TlsMode};
