//! Fixed response code table. Clients hardcode these values; never renumber.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Success,
    InvalidParam,
    Unauthorized,
    AlreadyRegistered,
    NotExist,
    ValidationFailed,
    ExceedLimit,
    InternalError,
}

impl ResponseCode {
    pub const ALL: [ResponseCode; 8] = [
        ResponseCode::Success,
        ResponseCode::InvalidParam,
        ResponseCode::Unauthorized,
        ResponseCode::AlreadyRegistered,
        ResponseCode::NotExist,
        ResponseCode::ValidationFailed,
        ResponseCode::ExceedLimit,
        ResponseCode::InternalError,
    ];

    /// Wire value of the code.
    pub const fn as_i32(self) -> i32 {
        match self {
            ResponseCode::Success => 0,
            ResponseCode::InvalidParam => -1,
            ResponseCode::Unauthorized => -2,
            ResponseCode::AlreadyRegistered => -3,
            ResponseCode::NotExist => -4,
            ResponseCode::ValidationFailed => -5,
            ResponseCode::ExceedLimit => -6,
            ResponseCode::InternalError => -100,
        }
    }

    /// Message used when a response carries no explicit message.
    pub const fn default_message(self) -> &'static str {
        match self {
            ResponseCode::Success => "success",
            ResponseCode::InvalidParam => "invalid parameter",
            ResponseCode::Unauthorized => "no permission",
            ResponseCode::AlreadyRegistered => "already registered",
            ResponseCode::NotExist => "object does not exist",
            ResponseCode::ValidationFailed => "validation failed",
            ResponseCode::ExceedLimit => "exceeded limit",
            ResponseCode::InternalError => "internal error",
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, ResponseCode::Success)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown response code: {0}")]
pub struct UnknownCode(pub i32);

impl TryFrom<i32> for ResponseCode {
    type Error = UnknownCode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        ResponseCode::ALL
            .into_iter()
            .find(|c| c.as_i32() == value)
            .ok_or(UnknownCode(value))
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for ResponseCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i32::deserialize(deserializer)?;
        ResponseCode::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_are_fixed() {
        let values: Vec<i32> = ResponseCode::ALL.iter().map(|c| c.as_i32()).collect();
        assert_eq!(values, vec![0, -1, -2, -3, -4, -5, -6, -100]);
    }

    #[test]
    fn try_from_rejects_unknown() {
        assert_eq!(ResponseCode::try_from(-4).unwrap(), ResponseCode::NotExist);
        assert!(ResponseCode::try_from(-7).is_err());
        assert!(ResponseCode::try_from(1).is_err());
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&ResponseCode::InternalError).unwrap();
        assert_eq!(json, "-100");
        let back: ResponseCode = serde_json::from_str("-6").unwrap();
        assert_eq!(back, ResponseCode::ExceedLimit);
        assert!(serde_json::from_str::<ResponseCode>("42").is_err());
    }

    #[test]
    fn only_success_is_success() {
        for code in ResponseCode::ALL {
            assert_eq!(code.is_success(), code == ResponseCode::Success);
        }
    }
}
