use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag attached to an EC2 resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Route table association of an attachment, as reported by EC2
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawAssociation {
    pub transit_gateway_route_table_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Attachment record from `describe-transit-gateway-attachments`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawAttachment {
    pub transit_gateway_attachment_id: String,

    /// Category tag, e.g. "vpc", "vpn", "peering"
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association: Option<RawAssociation>,
}

impl RawAttachment {
    /// Value of the `Name` tag, if any
    pub fn name_tag(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.key == "Name")
            .map(|tag| tag.value.as_str())
    }

    pub fn route_table_id(&self) -> Option<&str> {
        self.association
            .as_ref()
            .map(|assoc| assoc.transit_gateway_route_table_id.as_str())
    }
}

/// Top-level document returned by `describe-transit-gateway-attachments`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeAttachmentsOutput {
    #[serde(default)]
    pub transit_gateway_attachments: Vec<RawAttachment>,
}

/// Target of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawRouteAttachment {
    pub transit_gateway_attachment_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

/// Route record from `search-transit-gateway-routes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_cidr_block: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_list_id: Option<String>,

    pub state: String,

    /// "static" or "propagated"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(default)]
    pub transit_gateway_attachments: Vec<RawRouteAttachment>,
}

/// Top-level document returned by `search-transit-gateway-routes`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchRoutesOutput {
    #[serde(default)]
    pub routes: Vec<RawRoute>,

    #[serde(default)]
    pub additional_routes_available: bool,
}

/// Route states the matrix cares about. Everything else is filtered out at the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteState {
    Active,
    Blackhole,
}

impl RouteState {
    pub const QUERIED: [RouteState; 2] = [RouteState::Active, RouteState::Blackhole];

    pub fn as_str(self) -> &'static str {
        match self {
            RouteState::Active => "active",
            RouteState::Blackhole => "blackhole",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(RouteState::Active),
            "blackhole" => Some(RouteState::Blackhole),
            _ => None,
        }
    }
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized route: destination prefix, state and at most one target attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub destination: String,
    pub state: RouteState,

    /// `None` for dangling routes (static blackholes have no target)
    pub target: Option<String>,
}

impl Route {
    /// Normalize a raw route. Returns `None` for states outside active/blackhole.
    pub fn from_raw(raw: &RawRoute) -> Option<Self> {
        let state = RouteState::parse(&raw.state)?;
        let destination = raw
            .destination_cidr_block
            .clone()
            .or_else(|| raw.prefix_list_id.clone())
            .unwrap_or_default();

        if raw.transit_gateway_attachments.len() > 1 {
            log::debug!(
                "Route {} has {} targets, using the first",
                destination,
                raw.transit_gateway_attachments.len()
            );
        }
        let target = raw
            .transit_gateway_attachments
            .first()
            .map(|att| att.transit_gateway_attachment_id.clone());

        Some(Self {
            destination,
            state,
            target,
        })
    }

    pub fn targets(&self, attachment_id: &str) -> bool {
        self.target.as_deref() == Some(attachment_id)
    }

    pub fn is_dangling(&self) -> bool {
        self.target.is_none()
    }
}

/// Attachment with its display name resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub resource_type: String,

    /// Value of the `Name` tag (or the id when the tag is missing and the policy allows it)
    pub name: String,

    /// Alias for `name`, or `name` itself
    pub friendly_name: String,

    pub route_table_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_describe_output() {
        let doc = r#"{
            "TransitGatewayAttachments": [
                {
                    "TransitGatewayAttachmentId": "tgw-attach-0a",
                    "TransitGatewayId": "tgw-01",
                    "ResourceType": "vpc",
                    "ResourceId": "vpc-11",
                    "State": "available",
                    "Association": {
                        "TransitGatewayRouteTableId": "tgw-rtb-01",
                        "State": "associated"
                    },
                    "Tags": [{"Key": "env", "Value": "prod"}, {"Key": "Name", "Value": "shared"}]
                },
                {
                    "TransitGatewayAttachmentId": "tgw-attach-0b",
                    "ResourceType": "vpn"
                }
            ]
        }"#;

        let out: DescribeAttachmentsOutput = serde_json::from_str(doc).unwrap();
        assert_eq!(out.transit_gateway_attachments.len(), 2);

        let first = &out.transit_gateway_attachments[0];
        assert_eq!(first.name_tag(), Some("shared"));
        assert_eq!(first.route_table_id(), Some("tgw-rtb-01"));

        let second = &out.transit_gateway_attachments[1];
        assert_eq!(second.name_tag(), None);
        assert_eq!(second.route_table_id(), None);
    }

    #[test]
    fn normalizes_routes() {
        let doc = r#"{
            "Routes": [
                {
                    "DestinationCidrBlock": "10.1.0.0/16",
                    "State": "active",
                    "Type": "propagated",
                    "TransitGatewayAttachments": [
                        {"TransitGatewayAttachmentId": "tgw-attach-0b", "ResourceType": "vpc"}
                    ]
                },
                {"DestinationCidrBlock": "10.9.0.0/16", "State": "blackhole", "Type": "static"},
                {"PrefixListId": "pl-123", "State": "deleting"}
            ],
            "AdditionalRoutesAvailable": false
        }"#;

        let out: SearchRoutesOutput = serde_json::from_str(doc).unwrap();
        let routes: Vec<Route> = out.routes.iter().filter_map(Route::from_raw).collect();

        assert_eq!(
            routes,
            vec![
                Route {
                    destination: "10.1.0.0/16".to_string(),
                    state: RouteState::Active,
                    target: Some("tgw-attach-0b".to_string()),
                },
                Route {
                    destination: "10.9.0.0/16".to_string(),
                    state: RouteState::Blackhole,
                    target: None,
                },
            ]
        );
        assert!(routes[0].targets("tgw-attach-0b"));
        assert!(routes[1].is_dangling());
    }

    #[test]
    fn prefix_list_routes_use_list_id_as_destination() {
        let raw = RawRoute {
            destination_cidr_block: None,
            prefix_list_id: Some("pl-42".to_string()),
            state: "active".to_string(),
            r#type: None,
            transit_gateway_attachments: vec![],
        };
        let route = Route::from_raw(&raw).unwrap();
        assert_eq!(route.destination, "pl-42");
    }
}
