use conduit_weld::MemberError;

// ============================================================================
// Error Types (8000+ range - ext_ipc uses 7000)
// ============================================================================

/// Error codes for bridge operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BridgeErrorCode {
    /// Request could not be queued
    ChannelSend = 8000,
    /// Reply slot dropped before settling
    ChannelRecv = 8001,
    /// Nothing listens on the channel
    NoListener = 8002,
    /// Component dispatch failed
    Member = 8003,
    /// Blocking call on a non-blocking member
    NotBlocking = 8004,
    /// Stub table has no such member
    UnknownMember = 8005,
    /// Key combination could not be parsed
    InvalidHotkey = 8006,
    /// Hotkey backend refused a registration
    Hotkey = 8007,
    /// Payload could not be decoded
    Decode = 8008,
    /// No Tokio runtime to run bridge tasks on
    Runtime = 8009,
}

/// Custom error type for bridge operations
#[derive(Debug, thiserror::Error, deno_error::JsError)]
pub enum BridgeError {
    #[error("[{code}] Channel send error: {message}")]
    #[class(generic)]
    ChannelSend { code: u32, message: String },

    #[error("[{code}] Channel receive error: {message}")]
    #[class(generic)]
    ChannelRecv { code: u32, message: String },

    #[error("[{code}] No listener on channel: {channel}")]
    #[class(generic)]
    NoListener { code: u32, channel: String },

    #[error("[{code}] {source}")]
    #[class(generic)]
    Member {
        code: u32,
        #[source]
        source: MemberError,
    },

    #[error("[{code}] Not a blocking call: {name}")]
    #[class(generic)]
    NotBlocking { code: u32, name: String },

    #[error("[{code}] Unknown member: {member}")]
    #[class(generic)]
    UnknownMember { code: u32, member: String },

    #[error("[{code}] Invalid key combination '{combination}': {message}")]
    #[class(generic)]
    InvalidHotkey {
        code: u32,
        combination: String,
        message: String,
    },

    #[error("[{code}] Hotkey error: {message}")]
    #[class(generic)]
    Hotkey { code: u32, message: String },

    #[error("[{code}] Decode error: {message}")]
    #[class(generic)]
    Decode { code: u32, message: String },

    #[error("[{code}] Runtime error: {message}")]
    #[class(generic)]
    Runtime { code: u32, message: String },
}

impl BridgeError {
    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            code: BridgeErrorCode::ChannelSend as u32,
            message: message.into(),
        }
    }

    pub fn channel_recv(message: impl Into<String>) -> Self {
        Self::ChannelRecv {
            code: BridgeErrorCode::ChannelRecv as u32,
            message: message.into(),
        }
    }

    pub fn no_listener(channel: impl Into<String>) -> Self {
        Self::NoListener {
            code: BridgeErrorCode::NoListener as u32,
            channel: channel.into(),
        }
    }

    pub fn not_blocking(name: impl Into<String>) -> Self {
        Self::NotBlocking {
            code: BridgeErrorCode::NotBlocking as u32,
            name: name.into(),
        }
    }

    pub fn unknown_member(member: impl Into<String>) -> Self {
        Self::UnknownMember {
            code: BridgeErrorCode::UnknownMember as u32,
            member: member.into(),
        }
    }

    pub fn invalid_hotkey(combination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidHotkey {
            code: BridgeErrorCode::InvalidHotkey as u32,
            combination: combination.into(),
            message: message.into(),
        }
    }

    pub fn hotkey(message: impl Into<String>) -> Self {
        Self::Hotkey {
            code: BridgeErrorCode::Hotkey as u32,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            code: BridgeErrorCode::Decode as u32,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            code: BridgeErrorCode::Runtime as u32,
            message: message.into(),
        }
    }

    /// Numeric code carried by every variant
    pub fn code(&self) -> u32 {
        match self {
            Self::ChannelSend { code, .. }
            | Self::ChannelRecv { code, .. }
            | Self::NoListener { code, .. }
            | Self::Member { code, .. }
            | Self::NotBlocking { code, .. }
            | Self::UnknownMember { code, .. }
            | Self::InvalidHotkey { code, .. }
            | Self::Hotkey { code, .. }
            | Self::Decode { code, .. }
            | Self::Runtime { code, .. } => *code,
        }
    }
}

impl From<MemberError> for BridgeError {
    fn from(source: MemberError) -> Self {
        Self::Member {
            code: BridgeErrorCode::Member as u32,
            source,
        }
    }
}

impl From<tokio::runtime::TryCurrentError> for BridgeError {
    fn from(e: tokio::runtime::TryCurrentError) -> Self {
        Self::runtime(e.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e.to_string())
    }
}
