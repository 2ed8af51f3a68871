use serde::{Deserialize, Serialize};

use crate::{KinshipError, KinshipResult, RequestParams};

pub const PROPERTY_PREFIX: &str = "property-";
pub const ALIASES_PREFIX: &str = "aliases-";

/// A request argument name, recognised once and dispatched on exhaustively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterKey {
    Project,
    Schema,
    Property { name: String, historical: bool },
    Source,
    Target,
    Text,
    Facet,
    Limit,
    Offset,
}

impl FilterKey {
    /// Returns `None` for keys this layer does not understand.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "project" => Some(FilterKey::Project),
            "schema" => Some(FilterKey::Schema),
            "source" => Some(FilterKey::Source),
            "target" => Some(FilterKey::Target),
            "q" => Some(FilterKey::Text),
            "facet" => Some(FilterKey::Facet),
            "limit" => Some(FilterKey::Limit),
            "offset" => Some(FilterKey::Offset),
            _ => {
                let prop = key.strip_prefix(PROPERTY_PREFIX)?;
                let (name, historical) = match prop.strip_prefix(ALIASES_PREFIX) {
                    Some(name) => (name, true),
                    None => (prop, false),
                };
                if name.is_empty() {
                    return None;
                }
                Some(FilterKey::Property {
                    name: name.to_string(),
                    historical,
                })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub name: String,
    /// Match alias (inactive) rows as well as the active one.
    pub historical: bool,
    pub raw_value: String,
}

impl PropertyFilter {
    pub fn only_active(&self) -> bool {
        !self.historical
    }
}

/// One `schema` argument: any of the listed names matches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFilter(pub Vec<String>);

impl SchemaFilter {
    fn parse(raw: &str) -> Option<Self> {
        let names: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(Self(names))
        }
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: Option<u64>,
    pub offset: u64,
}

/// Typed view of the filter and facet arguments of one request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub project: Option<String>,
    pub schemas: Vec<SchemaFilter>,
    pub properties: Vec<PropertyFilter>,
    /// Raw endpoint arguments; only relation listings resolve them.
    pub source: Option<String>,
    pub target: Option<String>,
    pub text: Option<String>,
    pub facets: Vec<String>,
    pub page: Page,
}

impl Filters {
    pub fn parse(params: &RequestParams) -> KinshipResult<Self> {
        let mut filters = Filters::default();
        for key in params.keys() {
            let Some(parsed) = FilterKey::parse(key) else {
                log::debug!("ignoring unrecognised filter key '{key}'");
                continue;
            };
            match parsed {
                FilterKey::Project => {
                    filters.project = non_blank(params.single(key));
                }
                FilterKey::Schema => {
                    filters
                        .schemas
                        .extend(params.all(key).filter_map(SchemaFilter::parse));
                }
                FilterKey::Property { name, historical } => {
                    if let Some(raw_value) = params.single(key) {
                        filters.properties.push(PropertyFilter {
                            name,
                            historical,
                            raw_value: raw_value.to_string(),
                        });
                    }
                }
                FilterKey::Source => {
                    filters.source = non_blank(params.single(key));
                }
                FilterKey::Target => {
                    filters.target = non_blank(params.single(key));
                }
                FilterKey::Text => {
                    filters.text = params
                        .single(key)
                        .filter(|text| !text.trim().is_empty())
                        .map(str::to_string);
                }
                FilterKey::Facet => {
                    for path in params.all(key).map(str::trim) {
                        if !path.is_empty() && !filters.facets.iter().any(|seen| seen == path) {
                            filters.facets.push(path.to_string());
                        }
                    }
                }
                FilterKey::Limit => {
                    filters.page.limit = parse_count(params.single(key), "limit")?;
                }
                FilterKey::Offset => {
                    filters.page.offset = parse_count(params.single(key), "offset")?.unwrap_or(0);
                }
            }
        }
        Ok(filters)
    }

    /// Relations carry a single schema, so only the first `schema` argument applies.
    pub fn relation_schema(&self) -> Option<&SchemaFilter> {
        self.schemas.first()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_count(value: Option<&str>, key: &str) -> KinshipResult<Option<u64>> {
    match non_blank(value) {
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| KinshipError::invalid(format!("invalid {key} '{raw}'"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterKey, Filters, SchemaFilter};
    use crate::{EntityId, RequestParams};

    #[test]
    fn parses_property_keys() {
        assert_eq!(
            FilterKey::parse("property-capital"),
            Some(FilterKey::Property {
                name: "capital".to_string(),
                historical: false
            })
        );
        assert_eq!(
            FilterKey::parse("property-aliases-name"),
            Some(FilterKey::Property {
                name: "name".to_string(),
                historical: true
            })
        );
        assert_eq!(FilterKey::parse("property-"), None);
        assert_eq!(FilterKey::parse("property-aliases-"), None);
        assert_eq!(FilterKey::parse("sort"), None);
    }

    #[test]
    fn ignores_unknown_keys_and_blank_values() {
        let params = RequestParams::from_pairs([
            ("sort", "name"),
            ("project", "  "),
            ("schema", " , "),
            ("q", ""),
        ]);
        let filters = Filters::parse(&params).expect("filters");
        assert_eq!(filters, Filters::default());
    }

    #[test]
    fn schema_occurrences_stay_separate() {
        let params = RequestParams::from_pairs([
            ("schema", "person,company"),
            ("schema", "notable"),
        ]);
        let filters = Filters::parse(&params).expect("filters");
        assert_eq!(
            filters.schemas,
            vec![
                SchemaFilter(vec!["person".to_string(), "company".to_string()]),
                SchemaFilter(vec!["notable".to_string()]),
            ]
        );
        assert_eq!(
            filters.relation_schema().map(|schema| schema.names().len()),
            Some(2)
        );
    }

    #[test]
    fn property_filters_take_the_first_value() {
        let params = RequestParams::from_pairs([
            ("property-aliases-name", "Berlin"),
            ("property-aliases-name", "Bonn"),
            ("property-capital", "yes"),
        ]);
        let filters = Filters::parse(&params).expect("filters");
        assert_eq!(filters.properties.len(), 2);
        assert_eq!(filters.properties[0].raw_value, "Berlin");
        assert!(!filters.properties[0].only_active());
        assert!(filters.properties[1].only_active());
    }

    #[test]
    fn facets_keep_request_order_without_duplicates() {
        let params = RequestParams::from_pairs([
            ("facet", "schema"),
            ("facet", "outgoing.schema"),
            ("facet", "schema"),
        ]);
        let filters = Filters::parse(&params).expect("filters");
        assert_eq!(filters.facets, vec!["schema", "outgoing.schema"]);
    }

    #[test]
    fn endpoints_are_kept_raw() {
        let source = EntityId::new();
        let params = RequestParams::from_pairs([
            ("source", source.to_string()),
            ("target", "nope".to_string()),
        ]);
        let filters = Filters::parse(&params).expect("filters");
        assert_eq!(filters.source, Some(source.to_string()));
        assert_eq!(filters.target.as_deref(), Some("nope"));
    }

    #[test]
    fn text_search_keeps_surrounding_spaces() {
        let filters =
            Filters::parse(&RequestParams::from_pairs([("q", " ber")])).expect("filters");
        assert_eq!(filters.text.as_deref(), Some(" ber"));
    }

    #[test]
    fn paging_arguments_are_counts() {
        let params = RequestParams::from_pairs([("limit", "10"), ("offset", "20")]);
        let filters = Filters::parse(&params).expect("filters");
        assert_eq!(filters.page.limit, Some(10));
        assert_eq!(filters.page.offset, 20);
        assert!(Filters::parse(&RequestParams::from_pairs([("limit", "-1")])).is_err());
    }
}
