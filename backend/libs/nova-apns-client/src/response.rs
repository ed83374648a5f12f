//! Gateway response decoding

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Status code of an accepted notification
pub const STATUS_SENT: u16 = 200;

/// Rejection reasons reported in the response body
pub mod reason {
    pub const BAD_COLLAPSE_ID: &str = "BadCollapseId";
    pub const BAD_DEVICE_TOKEN: &str = "BadDeviceToken";
    pub const BAD_EXPIRATION_DATE: &str = "BadExpirationDate";
    pub const BAD_MESSAGE_ID: &str = "BadMessageId";
    pub const BAD_PRIORITY: &str = "BadPriority";
    pub const BAD_TOPIC: &str = "BadTopic";
    pub const DEVICE_TOKEN_NOT_FOR_TOPIC: &str = "DeviceTokenNotForTopic";
    pub const DUPLICATE_HEADERS: &str = "DuplicateHeaders";
    pub const IDLE_TIMEOUT: &str = "IdleTimeout";
    pub const INVALID_PUSH_TYPE: &str = "InvalidPushType";
    pub const MISSING_DEVICE_TOKEN: &str = "MissingDeviceToken";
    pub const MISSING_TOPIC: &str = "MissingTopic";
    pub const PAYLOAD_EMPTY: &str = "PayloadEmpty";
    pub const TOPIC_DISALLOWED: &str = "TopicDisallowed";
    pub const BAD_CERTIFICATE: &str = "BadCertificate";
    pub const BAD_CERTIFICATE_ENVIRONMENT: &str = "BadCertificateEnvironment";
    pub const EXPIRED_PROVIDER_TOKEN: &str = "ExpiredProviderToken";
    pub const FORBIDDEN: &str = "Forbidden";
    pub const INVALID_PROVIDER_TOKEN: &str = "InvalidProviderToken";
    pub const MISSING_PROVIDER_TOKEN: &str = "MissingProviderToken";
    pub const BAD_PATH: &str = "BadPath";
    pub const METHOD_NOT_ALLOWED: &str = "MethodNotAllowed";
    pub const UNREGISTERED: &str = "Unregistered";
    pub const PAYLOAD_TOO_LARGE: &str = "PayloadTooLarge";
    pub const TOO_MANY_PROVIDER_TOKEN_UPDATES: &str = "TooManyProviderTokenUpdates";
    pub const TOO_MANY_REQUESTS: &str = "TooManyRequests";
    pub const INTERNAL_SERVER_ERROR: &str = "InternalServerError";
    pub const SERVICE_UNAVAILABLE: &str = "ServiceUnavailable";
    pub const SHUTDOWN: &str = "Shutdown";
}

/// Outcome of a delivery attempt
///
/// `status_code` and `apns_id` come from the HTTP response; `reason` and
/// `timestamp` from its JSON body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Response {
    #[serde(skip)]
    pub status_code: u16,
    #[serde(skip)]
    pub apns_id: String,
    #[serde(default)]
    pub reason: String,
    /// When the device token stopped being valid (410 responses)
    #[serde(default, deserialize_with = "timestamp_millis::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Response {
    /// Combine HTTP status, `apns-id` header and (possibly empty) JSON body
    pub fn from_parts(
        status_code: u16,
        apns_id: impl Into<String>,
        body: &[u8],
    ) -> Result<Self, serde_json::Error> {
        let mut response = if body.iter().all(u8::is_ascii_whitespace) {
            Response::default()
        } else {
            serde_json::from_slice::<Response>(body)?
        };
        response.status_code = status_code;
        response.apns_id = apns_id.into();
        Ok(response)
    }

    pub fn sent(&self) -> bool {
        self.status_code == STATUS_SENT
    }
}

/// Milliseconds since the epoch, as a JSON number or a string of digits
mod timestamp_millis {
    use std::fmt;

    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::{self, Deserializer, Unexpected, Visitor};

    struct MillisVisitor;

    impl MillisVisitor {
        fn from_millis<E: de::Error>(millis: i64) -> Result<Option<DateTime<Utc>>, E> {
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(Some)
                .ok_or_else(|| E::invalid_value(Unexpected::Signed(millis), &"a valid timestamp"))
        }
    }

    impl<'de> Visitor<'de> for MillisVisitor {
        type Value = Option<DateTime<Utc>>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("milliseconds since the unix epoch")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Self::from_millis(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            let millis = i64::try_from(v)
                .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))?;
            Self::from_millis(millis)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let millis = v
                .parse::<i64>()
                .map_err(|_| E::invalid_type(Unexpected::Str(v), &self))?;
            Self::from_millis(millis)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        deserializer.deserialize_any(MillisVisitor)
    }
}
