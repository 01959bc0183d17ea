use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// Transient reference to a row owned by the entity collection. Handles stay
// stable for the lifetime of the row; they are never reused.
id_newtype!(EntityHandle);
id_newtype!(SubscriptionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonField {
    UserName,
    FirstName,
    LastName,
    Age,
}

impl PersonField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserName => "UserName",
            Self::FirstName => "FirstName",
            Self::LastName => "LastName",
            Self::Age => "Age",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "username" | "user_name" => Some(Self::UserName),
            "firstname" | "first_name" => Some(Self::FirstName),
            "lastname" | "last_name" => Some(Self::LastName),
            "age" => Some(Self::Age),
            _ => None,
        }
    }
}

impl fmt::Display for PersonField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row payload of the people list. `user_name` is the stable key once the
/// row has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Person {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub age: String,
}

impl Person {
    pub fn new(
        user_name: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        age: u32,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            age: age.to_string(),
        }
    }

    /// Blank row used for creation; only the age carries a value.
    pub fn blank(default_age: u32) -> Self {
        Self {
            age: default_age.to_string(),
            ..Self::default()
        }
    }

    pub fn field(&self, field: PersonField) -> &str {
        match field {
            PersonField::UserName => &self.user_name,
            PersonField::FirstName => &self.first_name,
            PersonField::LastName => &self.last_name,
            PersonField::Age => &self.age,
        }
    }

    pub fn set_field(&mut self, field: PersonField, value: impl Into<String>) {
        let value = value.into();
        match field {
            PersonField::UserName => self.user_name = value,
            PersonField::FirstName => self.first_name = value,
            PersonField::LastName => self.last_name = value,
            PersonField::Age => self.age = value,
        }
    }
}

/// Three-state list ordering. The successor cycle is fixed:
/// `None -> Ascending -> Descending -> None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    None,
    Ascending,
    Descending,
}

impl SortOrder {
    pub const CYCLE: [SortOrder; 3] = [Self::None, Self::Ascending, Self::Descending];

    pub fn index(self) -> usize {
        match self {
            Self::None => 0,
            Self::Ascending => 1,
            Self::Descending => 2,
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::CYCLE[index % Self::CYCLE.len()]
    }

    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}
