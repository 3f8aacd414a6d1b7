use std::time::Duration;

use serde::Deserialize;

/// CORS configuration for browser clients
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins (wildcard "*" or explicit list)
    #[serde(default)]
    pub origins: AnyOrArray,
    /// Allowed HTTP methods (wildcard "*" or explicit list)
    #[serde(default)]
    pub methods: AnyOrArray,
    /// Allowed request headers (wildcard "*" or explicit list)
    #[serde(default)]
    pub headers: AnyOrArray,
    /// Max age for preflight cache in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

/// Either a wildcard "*" or an explicit list of values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnyOrArray {
    #[default]
    Any,
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for AnyOrArray {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        let values = match Raw::deserialize(deserializer)? {
            Raw::One(value) => vec![value],
            Raw::Many(values) => values,
        };

        if values.iter().any(|value| value == "*") {
            Ok(Self::Any)
        } else {
            Ok(Self::List(values))
        }
    }
}

impl CorsConfig {
    /// Preflight max age as a `Duration`
    pub fn max_age_duration(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_string() {
        let config: CorsConfig = toml::from_str(r#"origins = "*""#).unwrap();
        assert_eq!(config.origins, AnyOrArray::Any);
    }

    #[test]
    fn wildcard_inside_list_wins() {
        let config: CorsConfig = toml::from_str(r#"origins = ["http://localhost:3000", "*"]"#).unwrap();
        assert_eq!(config.origins, AnyOrArray::Any);
    }

    #[test]
    fn explicit_list() {
        let config: CorsConfig = toml::from_str(
            r#"
            origins = ["http://localhost:3000"]
            methods = ["GET", "POST"]
            max_age = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.origins, AnyOrArray::List(vec!["http://localhost:3000".to_string()]));
        assert_eq!(config.methods, AnyOrArray::List(vec!["GET".to_string(), "POST".to_string()]));
        assert_eq!(config.headers, AnyOrArray::Any);
        assert_eq!(config.max_age_duration(), Some(Duration::from_secs(600)));
    }
}
