//! Directory schema configuration.

use serde::{Deserialize, Serialize};

/// Where Hologram looks in the directory and which attributes it reads.
///
/// Every attribute name is configurable so the server can sit on top of
/// an existing directory layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySchema {
    /// Root of every search.
    pub base_dn: String,

    /// Attribute holding the username.
    pub user_attr: String,

    /// Attribute holding a user's SSH public keys.
    pub pub_keys_attr: String,

    /// Attribute holding the password hash checked by `AddSshKey`.
    pub password_attr: String,

    /// Attribute listing the DNs of the groups a user belongs to.
    pub member_of_attr: String,

    /// Object class identifying role-granting groups.
    pub group_class: String,

    /// Group attribute listing the role ARNs the group grants.
    pub role_attr: String,

    /// Group attribute holding the session duration in seconds.
    /// `None` means every group uses the default duration.
    pub role_timeout_attr: Option<String>,

    /// User attribute naming the user's default role.
    pub default_role_attr: String,
}

impl Default for DirectorySchema {
    fn default() -> Self {
        Self {
            base_dn: String::new(),
            user_attr: "cn".to_string(),
            pub_keys_attr: "sshPublicKey".to_string(),
            password_attr: "userPassword".to_string(),
            member_of_attr: "memberOf".to_string(),
            group_class: "groupOfNames".to_string(),
            role_attr: "businessCategory".to_string(),
            role_timeout_attr: Some("hologramRoleTimeout".to_string()),
            default_role_attr: "hologramDefaultRole".to_string(),
        }
    }
}
