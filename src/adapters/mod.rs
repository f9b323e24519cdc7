//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                        |
//! |------------|---------------------|------------------------------------|
//! | `hardware` | HvacInputPort       | any embedded-hal input pin         |
//! |            | DiffuserOutputPort  | any embedded-hal output pins       |
//! | `gpio`     | (pin factory)       | Linux gpiochip cdev / simulation   |
//! | `storage`  | StatePort           | `state.json` (atomic replace)      |
//! |            | HistoryLogPort      | `history.bin` (COBS frame log)     |
//! | `time`     | ClockPort           | `Instant` + system wall clock      |
//! | `log_sink` | EventSink           | `log` facade                       |

pub mod gpio;
pub mod hardware;
pub mod log_sink;
pub mod storage;
pub mod time;
