use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Sensor error on {sensor}: {message}")]
    Sensor { sensor: String, message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Publish error: {message}")]
    Publish { message: String },

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl VigilError {
    pub fn sensor<S: Into<String>>(sensor: S, message: S) -> Self {
        Self::Sensor {
            sensor: sensor.into(),
            message: message.into(),
        }
    }

    pub fn capture<S: Into<String>>(message: S) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }

    pub fn publish<S: Into<String>>(message: S) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }

    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VigilError>;
