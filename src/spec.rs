use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The runtime spec document wrapped by an artifact's primary layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSpec {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub version: String,
    /// Components keyed by name; a BTreeMap keeps validation and
    /// re-serialization order deterministic
    pub spec: BTreeMap<String, Component>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub registry: String,
    pub digest: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub var_type: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(rename = "teeEnabled")]
    pub tee_enabled: bool,
}

impl RuntimeSpec {
    pub fn parse_yaml(data: &[u8]) -> Result<Self> {
        Ok(serde_yaml::from_slice(data)?)
    }

    pub fn parse_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn to_yaml(&self) -> Result<Vec<u8>> {
        Ok(serde_yaml::to_string(self)?.into_bytes())
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Structural validation: required fields are present and the component
    /// map is not empty. Never contacts a registry and never checks that a
    /// component digest actually resolves to pullable content.
    pub fn validate(&self) -> Result<()> {
        if self.api_version.is_empty() {
            return Err(Error::MissingField("apiVersion".to_string()));
        }
        if self.kind.is_empty() {
            return Err(Error::MissingField("kind".to_string()));
        }
        if self.name.is_empty() {
            return Err(Error::MissingField("name".to_string()));
        }
        if self.version.is_empty() {
            return Err(Error::MissingField("version".to_string()));
        }
        if self.spec.is_empty() {
            return Err(Error::MissingField("spec (no components)".to_string()));
        }

        for (component_name, component) in &self.spec {
            if component.registry.is_empty() {
                return Err(Error::MissingField(format!(
                    "spec.{component_name}.registry"
                )));
            }
            if component.digest.is_empty() {
                return Err(Error::MissingField(format!("spec.{component_name}.digest")));
            }
            for (i, env) in component.env.iter().enumerate() {
                if env.name.is_empty() {
                    return Err(Error::MissingField(format!(
                        "spec.{component_name}.env[{i}].name"
                    )));
                }
            }
        }

        Ok(())
    }
}
