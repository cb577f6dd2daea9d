use std::collections::HashSet;

/// Credentials and user allow-lists, read from the environment only.
///
/// An unset credential rejects every request that needs it.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Slash-command verification token
    pub slack_verification_token: Option<String>,
    /// Workspace the slash commands must come from
    pub slack_team_id: Option<String>,
    /// Bot token for outbound notifications
    pub slack_write_token: Option<String>,
    /// Chat users allowed to queue door actions and toggle policy
    pub acs_action_users: AccessList,
    /// Chat users allowed to queue camera and camera power actions
    pub cam_action_users: AccessList,
    /// Shared token door controllers send in their JSON bodies
    pub acs_token: Option<String>,
    /// Bearer token cameras send
    pub camera_token: Option<String>,
    /// Bearer token the camera power unit sends
    pub camctl_token: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            slack_verification_token: env_nonempty("SLACK_VERIFICATION_TOKEN"),
            slack_team_id: env_nonempty("SLACK_TEAM_ID"),
            slack_write_token: env_nonempty("SLACK_WRITE_TOKEN"),
            acs_action_users: AccessList::parse(&std::env::var("ACS_ACTION_USERS").unwrap_or_default()),
            cam_action_users: AccessList::parse(&std::env::var("CAM_ACTION_USERS").unwrap_or_default()),
            acs_token: env_nonempty("ACS_VERIFICATION_TOKEN"),
            camera_token: env_nonempty("CAMERA_VERIFICATION_TOKEN"),
            camctl_token: env_nonempty("CAMCTL_VERIFICATION_TOKEN"),
        }
    }

    /// Names of required credentials that are missing, for startup warnings
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.slack_verification_token.is_none() {
            missing.push("SLACK_VERIFICATION_TOKEN");
        }
        if self.slack_team_id.is_none() {
            missing.push("SLACK_TEAM_ID");
        }
        if self.acs_token.is_none() {
            missing.push("ACS_VERIFICATION_TOKEN");
        }
        if self.camera_token.is_none() {
            missing.push("CAMERA_VERIFICATION_TOKEN");
        }
        if self.camctl_token.is_none() {
            missing.push("CAMCTL_VERIFICATION_TOKEN");
        }
        missing
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Set of chat user IDs permitted to perform a class of actions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessList {
    users: HashSet<String>,
}

impl AccessList {
    /// Parse a comma-separated list, ignoring blanks
    pub fn parse(list: &str) -> Self {
        Self {
            users: list
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn allows(&self, user_id: &str) -> bool {
        self.users.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for AccessList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            users: iter.into_iter().map(Into::into).collect(),
        }
    }
}
