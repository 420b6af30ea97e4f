use std::{
    error::Error,
    fmt::{
        Display,
        Formatter,
        Result,
    },
};
use tokio_tungstenite::tungstenite::error::Error as TungsteniteError;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;

pub type ShunkoResult<T> = ::std::result::Result<T, ShunkoError>;

#[derive(Debug)]
#[non_exhaustive]
pub enum ShunkoError {
    /// A configuration value was missing or invalid when building the manager.
    Misconfigured(String),
    /// A control method received a value it can't forward to the node.
    InvalidArgument(String),
    NoWebsocket,
    NoNodes,
    NodeNotFound,
    NoMatches(String),
    UnknownEngine(String),
    CatalogUnavailable,
    Catalog(String),
    Voice(String),
    Json(JsonError),
    Http(ReqwestError),
    ErrorSendingPayload(TungsteniteError),
}

impl Error for ShunkoError {}

impl Display for ShunkoError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            ShunkoError::Misconfigured(why) => write!(f, "Invalid configuration: {}", why),
            ShunkoError::InvalidArgument(why) => write!(f, "Invalid argument: {}", why),
            ShunkoError::NoWebsocket => write!(f, "There is no initialized websocket."),
            ShunkoError::NoNodes => write!(f, "No nodes are online."),
            ShunkoError::NodeNotFound => write!(f, "Cannot find node, this can mean the node you're trying to search is not available or not exists"),
            ShunkoError::NoMatches(query) => write!(f, "No tracks were found for `{}`", query),
            ShunkoError::UnknownEngine(engine) => write!(f, "`{}` is not a known search engine", engine),
            ShunkoError::CatalogUnavailable => write!(f, "No catalog client was configured"),
            ShunkoError::Catalog(why) => write!(f, "Catalog request failed: {}", why),
            ShunkoError::Voice(why) => write!(f, "Voice connection failed: {}", why),
            ShunkoError::Json(why) => write!(f, "Invalid json payload: {}", why),
            ShunkoError::Http(why) => write!(f, "Http request failed: {}", why),
            ShunkoError::ErrorSendingPayload(why) => write!(f, "Error while sending payload, json => {:?}", why),
        }
    }
}

impl From<TungsteniteError> for ShunkoError {
    fn from(e: TungsteniteError) -> ShunkoError {
        Self::ErrorSendingPayload(e)
    }
}

impl From<ReqwestError> for ShunkoError {
    fn from(e: ReqwestError) -> ShunkoError {
        Self::Http(e)
    }
}

impl From<JsonError> for ShunkoError {
    fn from(e: JsonError) -> ShunkoError {
        Self::Json(e)
    }
}
