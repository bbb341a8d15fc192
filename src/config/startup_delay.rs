use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::time::Duration;

/// How long to wait after launching the runner container before relaying
/// the first command to it.
#[derive(Clone, Debug, PartialEq)]
pub struct StartupDelay(Duration);

impl StartupDelay {
    pub fn from_millis(millis: u64) -> Self {
        StartupDelay(Duration::from_millis(millis))
    }

    pub fn from_secs(secs: u64) -> Self {
        StartupDelay(Duration::from_secs(secs))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl Default for StartupDelay {
    fn default() -> Self {
        StartupDelay::from_secs(2)
    }
}

impl<'de> Deserialize<'de> for StartupDelay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StartupDelayVisitor)
    }
}

struct StartupDelayVisitor;

impl<'de> de::Visitor<'de> for StartupDelayVisitor {
    type Value = StartupDelay;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number of seconds or a string ending with 's' or 'ms'")
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        u64::try_from(v)
            .map(StartupDelay::from_secs)
            .map_err(|_| E::custom("startup delay cannot be negative"))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(StartupDelay::from_secs(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let v = v.trim();
        if v.is_empty() {
            return Err(E::custom("startup delay string cannot be empty"));
        }

        if let Some(num_part) = v.strip_suffix("ms") {
            num_part
                .trim()
                .parse::<u64>()
                .map(StartupDelay::from_millis)
                .map_err(|_| E::custom("invalid number in startup delay with 'ms'"))
        } else if let Some(num_part) = v.strip_suffix('s') {
            num_part
                .trim()
                .parse::<u64>()
                .map(StartupDelay::from_secs)
                .map_err(|_| E::custom("invalid number in startup delay with 's'"))
        } else {
            v.parse::<u64>()
                .map(StartupDelay::from_secs)
                .map_err(|_| E::custom("invalid startup delay string"))
        }
    }
}

impl Serialize for StartupDelay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = self.0.as_millis();
        if millis % 1000 == 0 {
            serializer.serialize_str(&format!("{}s", millis / 1000))
        } else {
            serializer.serialize_str(&format!("{}ms", millis))
        }
    }
}
