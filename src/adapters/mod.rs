//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements             | Connects to                   |
//! |-------------|------------------------|-------------------------------|
//! | `hardware`  | SensorPort             | Modbus probes, SDP6xx (I²C)   |
//! |             | ActuatorPort           | Modbus fan controller         |
//! | `eeprom`    | SetpointStore          | 24C-series EEPROM (I²C)       |
//! | `log_sink`  | EventSink              | Serial log output             |
//! | `display`   | DisplayPort            | Serial log (frame mirror)     |
//! | `time`      | Clock                  | ESP32 system timer            |
//! | `wifi`      | ConnectivityPort       | ESP-IDF WiFi STA              |
//! | `http`      | HttpTransport          | ESP-IDF HTTPS client          |

pub mod display;
pub mod eeprom;
pub mod hardware;
#[cfg(target_os = "espidf")]
pub mod http;
pub mod log_sink;
pub mod time;
pub mod wifi;
