use crate::alias::AliasMap;
use crate::error::{FabricError, Result};
use crate::types::{Attachment, RawAttachment};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What to do with an attachment that has no `Name` tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamePolicy {
    /// Use the attachment id as its name
    #[default]
    FallbackToId,

    /// Fail the run
    Strict,
}

/// Attachments in matrix order: by (resource type, friendly name), stable on ties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttachmentCatalog {
    attachments: Vec<Attachment>,
}

impl AttachmentCatalog {
    pub fn build(raw: &[RawAttachment], aliases: &AliasMap, policy: NamePolicy) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut attachments = Vec::with_capacity(raw.len());

        for record in raw {
            let id = &record.transit_gateway_attachment_id;
            if !seen.insert(id.clone()) {
                log::debug!("Skipping duplicate attachment {}", id);
                continue;
            }

            let name = match (record.name_tag(), policy) {
                (Some(name), _) => name.to_string(),
                (None, NamePolicy::Strict) => {
                    return Err(FabricError::MissingNameTag(id.clone()))
                }
                (None, NamePolicy::FallbackToId) => {
                    log::warn!("Attachment {} has no Name tag, using its id", id);
                    id.clone()
                }
            };
            let friendly_name = aliases.resolve(&name).to_string();

            attachments.push(Attachment {
                id: id.clone(),
                resource_type: record.resource_type.clone(),
                name,
                friendly_name,
                route_table_id: record.route_table_id().map(str::to_string),
            });
        }

        // sort_by is stable
        attachments.sort_by(|a, b| {
            a.resource_type
                .cmp(&b.resource_type)
                .then_with(|| a.friendly_name.cmp(&b.friendly_name))
        });

        Ok(Self { attachments })
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|att| att.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.attachments.iter().position(|att| att.id == id)
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawAssociation, Tag};
    use pretty_assertions::assert_eq;

    fn raw(id: &str, resource_type: &str, name: Option<&str>, rtb: Option<&str>) -> RawAttachment {
        RawAttachment {
            transit_gateway_attachment_id: id.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: None,
            state: None,
            tags: name
                .map(|value| {
                    vec![Tag {
                        key: "Name".to_string(),
                        value: value.to_string(),
                    }]
                })
                .unwrap_or_default(),
            association: rtb.map(|id| RawAssociation {
                transit_gateway_route_table_id: id.to_string(),
                state: Some("associated".to_string()),
            }),
        }
    }

    fn ids(catalog: &AttachmentCatalog) -> Vec<&str> {
        catalog.iter().map(|att| att.id.as_str()).collect()
    }

    #[test]
    fn sorts_by_type_then_friendly_name() {
        let records = vec![
            raw("a-1", "vpn", Some("office"), None),
            raw("a-2", "vpc", Some("zeta"), Some("rtb-1")),
            raw("a-3", "vpc", Some("alpha"), Some("rtb-1")),
            raw("a-4", "peering", Some("eu"), Some("rtb-2")),
        ];
        let mut aliases = AliasMap::new();
        aliases.insert("zeta", "Analytics");

        let catalog = AttachmentCatalog::build(&records, &aliases, NamePolicy::default()).unwrap();
        assert_eq!(ids(&catalog), vec!["a-4", "a-2", "a-3", "a-1"]);

        let analytics = catalog.get("a-2").unwrap();
        assert_eq!(analytics.name, "zeta");
        assert_eq!(analytics.friendly_name, "Analytics");
        assert_eq!(catalog.get("a-1").unwrap().route_table_id, None);
        assert_eq!(catalog.get("a-3").unwrap().route_table_id.as_deref(), Some("rtb-1"));
    }

    #[test]
    fn serializes_in_matrix_order() {
        let records = vec![
            raw("a-1", "vpn", Some("office"), None),
            raw("a-2", "vpc", Some("alpha"), Some("rtb-1")),
        ];
        let catalog = AttachmentCatalog::build(&records, &AliasMap::new(), NamePolicy::Strict).unwrap();
        let value = serde_json::to_value(&catalog).unwrap();
        let exported: Vec<&str> = value["attachments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|att| att["id"].as_str().unwrap())
            .collect();
        assert_eq!(exported, vec!["a-2", "a-1"]);
    }

    #[test]
    fn ordering_is_case_sensitive_and_stable() {
        let records = vec![
            raw("a-1", "vpc", Some("b"), None),
            raw("a-2", "vpc", Some("B"), None),
            raw("a-3", "vpc", Some("b"), None),
        ];
        let catalog = AttachmentCatalog::build(&records, &AliasMap::new(), NamePolicy::Strict).unwrap();
        assert_eq!(ids(&catalog), vec!["a-2", "a-1", "a-3"]);
    }

    #[test]
    fn duplicates_keep_first_record() {
        let records = vec![
            raw("a-1", "vpc", Some("first"), None),
            raw("a-1", "vpc", Some("second"), None),
        ];
        let catalog = AttachmentCatalog::build(&records, &AliasMap::new(), NamePolicy::Strict).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a-1").unwrap().name, "first");
    }

    #[test]
    fn missing_name_tag_follows_policy() {
        let records = vec![raw("tgw-attach-9", "vpc", None, None)];
        let mut aliases = AliasMap::new();
        aliases.insert("tgw-attach-9", "Legacy");

        let catalog = AttachmentCatalog::build(&records, &aliases, NamePolicy::FallbackToId).unwrap();
        let att = catalog.get("tgw-attach-9").unwrap();
        assert_eq!(att.name, "tgw-attach-9");
        assert_eq!(att.friendly_name, "Legacy");

        let err = AttachmentCatalog::build(&records, &aliases, NamePolicy::Strict).unwrap_err();
        assert!(matches!(err, FabricError::MissingNameTag(id) if id == "tgw-attach-9"));
    }
}
