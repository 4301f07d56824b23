// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The detector chosen by configuration

use mxbi_adapters::{
    DetectorError, DetectorEventSource, EventHandler, LineTagReader, MockControl, MockDetector,
    RfidDetector,
};
use mxbi_core::{ConfigError, DetectorConfig, DetectorEventKind, DetectorKind, SessionConfig};

use crate::lifecycle::LifecycleError;

pub enum StationDetector {
    Mock(MockDetector),
    Rfid(RfidDetector<LineTagReader>),
}

impl StationDetector {
    /// Build the configured detector. The RFID port is opened here so a
    /// missing device fails startup.
    pub fn from_config(config: &SessionConfig) -> Result<Self, LifecycleError> {
        let DetectorConfig {
            kind,
            port,
            debounce,
            return_window,
            enter_on_start,
        } = &config.detector;

        match kind {
            DetectorKind::Mock => Ok(Self::Mock(MockDetector::new(
                config.animal_names(),
                *return_window,
                *enter_on_start,
            ))),
            DetectorKind::Rfid => {
                let port = port.as_deref().ok_or(ConfigError::MissingPort)?;
                let reader = LineTagReader::open(port)?;
                Ok(Self::Rfid(RfidDetector::new(
                    reader,
                    config.rfid_directory()?,
                    *debounce,
                    *return_window,
                )))
            }
        }
    }

    /// Keyboard control, for the mock detector only
    pub fn mock_control(&self) -> Option<MockControl> {
        match self {
            Self::Mock(mock) => Some(mock.control()),
            Self::Rfid(_) => None,
        }
    }
}

impl DetectorEventSource for StationDetector {
    fn register(&self, kind: DetectorEventKind, handler: EventHandler) {
        match self {
            Self::Mock(mock) => mock.register(kind, handler),
            Self::Rfid(rfid) => rfid.register(kind, handler),
        }
    }

    fn start(&self) -> Result<(), DetectorError> {
        match self {
            Self::Mock(mock) => mock.start(),
            Self::Rfid(rfid) => rfid.start(),
        }
    }

    fn stop(&self) {
        match self {
            Self::Mock(mock) => mock.stop(),
            Self::Rfid(rfid) => rfid.stop(),
        }
    }
}
