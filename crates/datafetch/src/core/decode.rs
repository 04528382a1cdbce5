//! Turning a successful payload into typed records.
//!
//! File formats live outside this crate; they plug in through [`Decoder`].

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

pub trait Decoder {
    type Output;
    type Error: std::error::Error;

    fn decode(&self, payload: &[u8]) -> Result<Self::Output, Self::Error>;
}

/// Decodes a JSON document into `T`.
pub struct JsonDecoder<T>(PhantomData<fn() -> T>);

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Decoder for JsonDecoder<T> {
    type Output = T;
    type Error = serde_json::Error;

    fn decode(&self, payload: &[u8]) -> Result<T, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Team {
        abbr:   String,
        season: u16,
    }

    #[test]
    fn test_json_decoder() {
        let teams: Vec<Team> = JsonDecoder::new()
            .decode(br#"[{"abbr":"KC","season":2023},{"abbr":"SF","season":2023}]"#)
            .unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0], Team { abbr: "KC".into(), season: 2023 });
    }

    #[test]
    fn test_json_decoder_rejects_garbage() {
        assert!(JsonDecoder::<Vec<Team>>::new().decode(b"season,team").is_err());
    }
}
