use bson::oid::ObjectId;
use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Application user as stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Unique across the collection
    pub email: String,
    pub phone: String,
    pub bio: String,
    pub active: bool,
    pub created_date: DateTime,
    pub created_by: String,
}

/// The two development accounts every fresh database starts with
pub fn seed_users(created_by: &str, now: DateTime) -> Vec<User> {
    let user = |name: &str, email: &str, phone: &str, bio: &str| User {
        id: None,
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        bio: bio.to_string(),
        active: true,
        created_date: now,
        created_by: created_by.to_string(),
    };

    vec![
        user(
            "João Silva",
            "joao@example.com",
            "(11) 99999-9999",
            "Desenvolvedor Java especialista em Spring Boot",
        ),
        user(
            "Maria Santos",
            "maria@example.com",
            "(11) 88888-8888",
            "Analista de sistemas com foco em APIs REST",
        ),
    ]
}
