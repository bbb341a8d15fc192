/// One row of the engine's model listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    pub name: String,
    pub id: String,
    pub size: String,
    pub size_unit: String,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDetails {
    pub architecture: String,
    pub quantization: String,
}

impl ModelDetails {
    pub const UNKNOWN: &'static str = "unknown";
}

impl Default for ModelDetails {
    fn default() -> Self {
        Self {
            architecture: Self::UNKNOWN.to_string(),
            quantization: Self::UNKNOWN.to_string(),
        }
    }
}
