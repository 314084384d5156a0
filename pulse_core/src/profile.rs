//! # Stored Profiles
//!
//! A [`StoredProfile`] is a named set of generator parameters as the operator
//! typed them, plus optional operator metadata. Profiles serialize to the flat
//! JSON layout used by existing saved data:
//!
//! ```text
//! { "id", "name", "T1", "T2", "T3", "T4", "polarity", "burst",
//!   "email"?, "age"?, "username"?, "password"? }
//! ```
//!
//! Parameter values are kept verbatim ([`ParamValue`]): a number stays a
//! number, a string stays a string, and nothing is coerced.
//!
//! ## Example
//!
//! ```rust
//! use pulse_core::profile::{GeneratorParams, Polarity, StoredProfile};
//!
//! let params = GeneratorParams::new(10, 20, 10, 60, false, Polarity::Bipolar);
//! let profile = StoredProfile::new("Rehab A", params);
//!
//! let json = serde_json::to_string(&profile).unwrap();
//! assert!(json.contains(r#""T1":10"#));
//! assert!(json.contains(r#""polarity":"B""#));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{PulseError, PulseResult};

/// Stable identifier assigned to a profile when it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(Uuid);

impl ProfileId {
    pub fn new() -> Self {
        ProfileId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        ProfileId::new()
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ProfileId {
    type Err = PulseError;

    fn from_str(s: &str) -> PulseResult<Self> {
        Uuid::parse_str(s.trim())
            .map(ProfileId)
            .map_err(|e| PulseError::invalid_input("id", s, e.to_string()))
    }
}

/// A parameter exactly as captured: either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(serde_json::Number),
    Text(String),
}

impl ParamValue {
    /// Numeric reading of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => n.as_f64(),
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, ParamValue::Text(s) if s.trim().is_empty())
    }
}

impl Default for ParamValue {
    fn default() -> Self {
        ParamValue::Text(String::new())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => fmt::Display::fmt(n, f),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<u64> for ParamValue {
    fn from(n: u64) -> Self {
        ParamValue::Number(n.into())
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        ParamValue::Number(n.into())
    }
}

impl From<Polarity> for ParamValue {
    fn from(polarity: Polarity) -> Self {
        ParamValue::Text(polarity.code().to_string())
    }
}

/// Polarity options offered to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// "B"
    Bipolar,
    /// "P"
    UnipolarPositive,
    /// "N"
    UnipolarNegative,
}

impl Polarity {
    pub const ALL: [Polarity; 3] = [
        Polarity::Bipolar,
        Polarity::UnipolarPositive,
        Polarity::UnipolarNegative,
    ];

    /// Code sent to the generator
    pub fn code(&self) -> &'static str {
        match self {
            Polarity::Bipolar => "B",
            Polarity::UnipolarPositive => "P",
            Polarity::UnipolarNegative => "N",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Polarity::ALL.into_iter().find(|p| p.code() == code.trim())
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Polarity::Bipolar => "Bipolar",
            Polarity::UnipolarPositive => "Unipolar Positive",
            Polarity::UnipolarNegative => "Unipolar Negative",
        }
    }
}

/// Request body for the external generator.
///
/// Values are passed through verbatim as captured. `burst` goes over the wire
/// as `0` or `1`, the form the generator reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneratorParams {
    #[serde(rename = "T1")]
    pub t1: ParamValue,
    #[serde(rename = "T2")]
    pub t2: ParamValue,
    #[serde(rename = "T3")]
    pub t3: ParamValue,
    #[serde(rename = "T4")]
    pub t4: ParamValue,
    #[serde(with = "burst_flag")]
    pub burst: bool,
    pub polarity: ParamValue,
}

impl GeneratorParams {
    pub fn new(
        t1: impl Into<ParamValue>,
        t2: impl Into<ParamValue>,
        t3: impl Into<ParamValue>,
        t4: impl Into<ParamValue>,
        burst: bool,
        polarity: impl Into<ParamValue>,
    ) -> Self {
        GeneratorParams {
            t1: t1.into(),
            t2: t2.into(),
            t3: t3.into(),
            t4: t4.into(),
            burst,
            polarity: polarity.into(),
        }
    }

    /// Interval values in T1..T4 order
    pub fn intervals(&self) -> [&ParamValue; 4] {
        [&self.t1, &self.t2, &self.t3, &self.t4]
    }
}

mod burst_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(burst: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*burst))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => b,
            Flag::Number(n) => n != 0.0,
        })
    }
}

/// A named, persisted parameter set.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProfile {
    /// Entries saved before ids existed get a fresh one when loaded
    #[serde(default)]
    pub id: ProfileId,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "T1", default)]
    pub t1: ParamValue,
    #[serde(rename = "T2", default)]
    pub t2: ParamValue,
    #[serde(rename = "T3", default)]
    pub t3: ParamValue,
    #[serde(rename = "T4", default)]
    pub t4: ParamValue,

    #[serde(default)]
    pub polarity: ParamValue,

    #[serde(default)]
    pub burst: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<ParamValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Carried only so existing saved data survives a round trip.
    /// Nothing in this crate sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl StoredProfile {
    /// Create a profile with a fresh id and no operator metadata.
    pub fn new(name: impl Into<String>, params: GeneratorParams) -> Self {
        StoredProfile {
            id: ProfileId::new(),
            name: name.into(),
            t1: params.t1,
            t2: params.t2,
            t3: params.t3,
            t4: params.t4,
            polarity: params.polarity,
            burst: params.burst,
            email: None,
            age: None,
            username: None,
            password: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_age(mut self, age: impl Into<ParamValue>) -> Self {
        self.age = Some(age.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Generator request for this profile's parameters
    pub fn params(&self) -> GeneratorParams {
        GeneratorParams {
            t1: self.t1.clone(),
            t2: self.t2.clone(),
            t3: self.t3.clone(),
            t4: self.t4.clone(),
            burst: self.burst,
            polarity: self.polarity.clone(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.password.is_some()
    }
}

impl fmt::Debug for StoredProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredProfile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("t1", &self.t1)
            .field("t2", &self.t2)
            .field("t3", &self.t3)
            .field("t4", &self.t4)
            .field("polarity", &self.polarity)
            .field("burst", &self.burst)
            .field("email", &self.email)
            .field("age", &self.age)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Field changes applied by [`crate::store::ProfileStore::commit_edit`].
///
/// `None` leaves the field as it is. The id is never changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub t1: Option<ParamValue>,
    pub t2: Option<ParamValue>,
    pub t3: Option<ParamValue>,
    pub t4: Option<ParamValue>,
    pub polarity: Option<ParamValue>,
    pub burst: Option<bool>,
    pub email: Option<String>,
    pub age: Option<ParamValue>,
    pub username: Option<String>,
}

impl ProfileEdit {
    pub fn is_empty(&self) -> bool {
        *self == ProfileEdit::default()
    }

    /// Merge the provided fields into `profile`.
    pub fn apply_to(&self, profile: &mut StoredProfile) {
        if let Some(name) = &self.name {
            profile.name = name.clone();
        }
        if let Some(v) = &self.t1 {
            profile.t1 = v.clone();
        }
        if let Some(v) = &self.t2 {
            profile.t2 = v.clone();
        }
        if let Some(v) = &self.t3 {
            profile.t3 = v.clone();
        }
        if let Some(v) = &self.t4 {
            profile.t4 = v.clone();
        }
        if let Some(v) = &self.polarity {
            profile.polarity = v.clone();
        }
        if let Some(burst) = self.burst {
            profile.burst = burst;
        }
        if let Some(email) = &self.email {
            profile.email = Some(email.clone());
        }
        if let Some(age) = &self.age {
            profile.age = Some(age.clone());
        }
        if let Some(username) = &self.username {
            profile.username = Some(username.clone());
        }
    }
}
