use serde::{Deserialize, Serialize};

/// Connection coordinates of a submitter's own cache, kept in the registry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingEndpoint {
    pub submitter_id: String,
    pub host: String,
    pub port: u16,
    pub credential: String,
}

impl std::fmt::Debug for ForwardingEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardingEndpoint")
            .field("submitter_id", &self.submitter_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("credential", &"***")
            .finish()
    }
}
