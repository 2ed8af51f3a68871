use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{KinshipError, KinshipResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Id(pub [u8; 16]);

impl Id {
    pub fn new() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }

    pub fn from_uuid_str(value: &str) -> KinshipResult<Self> {
        let uuid = Uuid::parse_str(value.trim())
            .map_err(|err| KinshipError::invalid(format!("invalid uuid '{value}': {err}")))?;
        Ok(Self(*uuid.as_bytes()))
    }

    pub fn to_uuid_string(self) -> String {
        Uuid::from_bytes(self.0).to_string()
    }

    pub fn as_bytes(self) -> [u8; 16] {
        self.0
    }

    pub fn as_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uuid = Uuid::from_bytes(self.0);
        write!(f, "{uuid}")
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_uuid_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Uuid::parse_str(&value)
            .map(|uuid| Id::from_bytes(*uuid.as_bytes()))
            .map_err(|_| serde::de::Error::custom("invalid Id string"))
    }
}

macro_rules! id_wrapper {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(pub Id);

        impl $name {
            pub fn new() -> Self {
                Self(Id::new())
            }

            pub fn parse(value: &str) -> KinshipResult<Self> {
                Ok(Self(Id::from_uuid_str(value)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                self.0.serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                Ok(Self(Id::deserialize(deserializer)?))
            }
        }
    };
}

id_wrapper!(AccountId);
id_wrapper!(ProjectId);
id_wrapper!(EntityId);
id_wrapper!(RelationId);
id_wrapper!(SchemaId);
id_wrapper!(AttributeId);
id_wrapper!(PropertyId);
