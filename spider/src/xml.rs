//! Namespace-aware readers for the two XML documents the service publishes:
//! the Atom service document listing datasets, and the EDMX metadata
//! document describing each dataset's properties.
//!
//! Both are small, so they are read into an [`Element`] tree first and then
//! walked with the same structural assertions the loaders rely on.

use std::io::BufRead;

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;

use crate::error::{Result, SpiderError};

pub const APP_NS: &str = "http://www.w3.org/2007/app";
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const EDMX_NS: &str = "http://schemas.microsoft.com/ado/2007/06/edmx";
pub const EDM_NS: &str = "http://schemas.microsoft.com/ado/2009/11/edm";

/// Name of the only schema, workspace and type namespace the service uses.
pub const DEFAULT_NAMESPACE: &str = "Default";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn required_attribute(&self, name: &str) -> Result<&str> {
        self.attribute(name).ok_or_else(|| {
            SpiderError::UnexpectedDocument(format!(
                "<{}> has no '{name}' attribute",
                self.name
            ))
        })
    }

    /// Direct children with the given namespace and local name.
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter(move |c| c.namespace.as_deref() == Some(namespace) && c.name == name)
    }

    /// The single direct child with the given name.
    fn only_child<'a>(&'a self, namespace: &'a str, name: &'a str) -> Result<&'a Element> {
        let found: Vec<&Element> = self.children_named(namespace, name).collect();
        match found.as_slice() {
            [one] => Ok(one),
            _ => Err(SpiderError::UnexpectedDocument(format!(
                "expected a single <{name}> in <{}> but found {}",
                self.name,
                found.len()
            ))),
        }
    }
}

fn namespace_of(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

fn start_element(
    reader: &NsReader<impl BufRead>,
    namespace: Option<String>,
    e: &BytesStart<'_>,
) -> Result<Element> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.prefix().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.decode_and_unescape_value(reader.decoder())?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        namespace,
        name,
        attributes,
        ..Element::default()
    })
}

/// Reads a whole document and returns its root element.
pub fn parse_document(source: impl BufRead) -> Result<Element> {
    let mut reader = NsReader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    let mut buf = Vec::new();

    loop {
        let (ns, event) = reader.read_resolved_event_into(&mut buf)?;
        let namespace = namespace_of(ns);
        match event {
            Event::Start(e) => {
                let element = start_element(&reader, namespace, &e)?;
                stack.push(element);
            }
            Event::Empty(e) => {
                let element = start_element(&reader, namespace, &e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(SpiderError::UnexpectedDocument("unbalanced end tag".into()));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| SpiderError::UnexpectedDocument("document has no root element".into()))
}

/// One `<app:collection>` of the service document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub dataset: String,
    pub href: String,
}

/// Lists the datasets of an Atom service document.
///
/// The document must hold exactly one workspace, titled `Default`. Each
/// collection's dataset name is the text of its first child element.
pub fn parse_service_document(source: impl BufRead) -> Result<Vec<CollectionRef>> {
    let root = parse_document(source)?;
    let workspace = root.only_child(APP_NS, "workspace")?;

    let titles: Vec<&Element> = workspace
        .children_named(ATOM_NS, "title")
        .filter(|t| t.attribute("type") == Some("text"))
        .collect();
    let [title] = titles.as_slice() else {
        return Err(SpiderError::UnexpectedDocument(format!(
            "expected a single text title in the workspace but found {}",
            titles.len()
        )));
    };
    if title.text != DEFAULT_NAMESPACE {
        return Err(SpiderError::UnexpectedDocument(format!(
            "expected a workspace titled '{DEFAULT_NAMESPACE}' but found '{}'",
            title.text
        )));
    }

    workspace
        .children_named(APP_NS, "collection")
        .map(|c| {
            let first = c.children.first().ok_or_else(|| {
                SpiderError::UnexpectedDocument("collection has no title".into())
            })?;
            Ok(CollectionRef {
                dataset: first.text.clone(),
                href: c.required_attribute("href")?.to_string(),
            })
        })
        .collect()
}

/// One `<Property>` of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDecl {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
}

/// An entity set and the properties of its entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySetSchema {
    pub dataset: String,
    pub properties: Vec<PropertyDecl>,
}

/// Reads every entity set of an EDMX metadata document.
///
/// Expects one `DataServices` holding one `Schema` in the `Default`
/// namespace with one `EntityContainer`. Each entity set must name a type
/// `Default.<T>` defined exactly once in that schema.
pub fn parse_edmx(source: impl BufRead) -> Result<Vec<EntitySetSchema>> {
    let root = parse_document(source)?;
    let data_services = root.only_child(EDMX_NS, "DataServices")?;
    let schema = data_services.only_child(EDM_NS, "Schema")?;

    let namespace = schema.required_attribute("Namespace")?;
    if namespace != DEFAULT_NAMESPACE {
        return Err(SpiderError::UnexpectedDocument(format!(
            "expected schema namespace '{DEFAULT_NAMESPACE}' but found '{namespace}'"
        )));
    }

    let container = schema.only_child(EDM_NS, "EntityContainer")?;
    let mut sets = Vec::new();
    for set in container.children_named(EDM_NS, "EntitySet") {
        let dataset = set.required_attribute("Name")?;
        let entity_type = set.required_attribute("EntityType")?;
        let parts: Vec<&str> = entity_type.split('.').collect();
        if parts[0] != DEFAULT_NAMESPACE {
            return Err(SpiderError::UnexpectedDocument(format!(
                "type {entity_type} is not in the default schema"
            )));
        }
        let [_, type_name] = parts.as_slice() else {
            return Err(SpiderError::UnexpectedDocument(format!(
                "type {entity_type} cannot be parsed"
            )));
        };

        let definitions: Vec<&Element> = schema
            .children_named(EDM_NS, "EntityType")
            .filter(|t| t.attribute("Name") == Some(*type_name))
            .collect();
        let [definition] = definitions.as_slice() else {
            return Err(SpiderError::UnexpectedDocument(format!(
                "expected 1 definition for type {type_name} but found {}",
                definitions.len()
            )));
        };

        let properties = definition
            .children_named(EDM_NS, "Property")
            .map(|p| {
                Ok(PropertyDecl {
                    name: p.required_attribute("Name")?.to_string(),
                    type_name: p.required_attribute("Type")?.to_string(),
                    nullable: p.attribute("Nullable").unwrap_or("true") != "false",
                })
            })
            .collect::<Result<Vec<_>>>()?;

        sets.push(EntitySetSchema {
            dataset: dataset.to_string(),
            properties,
        });
    }
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<service xml:base="http://open.statswales.gov.wales/en-gb/dataset/"
         xmlns="http://www.w3.org/2007/app" xmlns:atom="http://www.w3.org/2005/Atom">
  <workspace>
    <atom:title type="text">Default</atom:title>
    <collection href="agri0001"><atom:title type="text">agri0001</atom:title></collection>
    <collection href="hous0701"><atom:title type="text">hous0701</atom:title></collection>
  </workspace>
</service>"#;

    const EDMX: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx Version="1.0" xmlns:edmx="http://schemas.microsoft.com/ado/2007/06/edmx">
  <edmx:DataServices m:DataServiceVersion="1.0" xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata">
    <Schema Namespace="Default" xmlns="http://schemas.microsoft.com/ado/2009/11/edm">
      <EntityType Name="agri0001">
        <Key><PropertyRef Name="PartitionKey"/><PropertyRef Name="RowKey"/></Key>
        <Property Name="PartitionKey" Type="Edm.String" Nullable="false"/>
        <Property Name="RowKey" Type="Edm.String" Nullable="false"/>
        <Property Name="Data" Type="Edm.Double"/>
        <Property Name="Area_Code" Type="Edm.String"/>
        <Property Name="Area_ItemName_ENG" Type="Edm.String"/>
      </EntityType>
      <EntityContainer Name="Default" m:IsDefaultEntityContainer="true">
        <EntitySet Name="agri0001" EntityType="Default.agri0001"/>
      </EntityContainer>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

    #[test]
    fn test_parse_service_document() {
        let collections = parse_service_document(SERVICE.as_bytes()).unwrap();
        assert_eq!(
            collections,
            vec![
                CollectionRef { dataset: "agri0001".into(), href: "agri0001".into() },
                CollectionRef { dataset: "hous0701".into(), href: "hous0701".into() },
            ]
        );
    }

    #[test]
    fn test_service_document_needs_default_title() {
        let doc = SERVICE.replace(">Default<", ">Other<");
        let err = parse_service_document(doc.as_bytes()).unwrap_err();
        assert!(err.is_consistency());
        assert!(err.to_string().contains("Other"));
    }

    #[test]
    fn test_service_document_needs_one_workspace() {
        let doc = SERVICE.replace("</workspace>", "</workspace><workspace/>");
        assert!(matches!(
            parse_service_document(doc.as_bytes()),
            Err(SpiderError::UnexpectedDocument(_))
        ));
    }

    #[test]
    fn test_namespaces_are_resolved_not_prefixed() {
        // Same document with the Atom namespace bound to a different prefix.
        let doc = SERVICE.replace("atom:", "a:").replace("xmlns:atom", "xmlns:a");
        assert_eq!(parse_service_document(doc.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_edmx() {
        let sets = parse_edmx(EDMX.as_bytes()).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].dataset, "agri0001");
        let names: Vec<&str> = sets[0].properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["PartitionKey", "RowKey", "Data", "Area_Code", "Area_ItemName_ENG"]
        );
        assert!(!sets[0].properties[0].nullable);
        assert!(sets[0].properties[2].nullable);
        assert_eq!(sets[0].properties[2].type_name, "Edm.Double");
    }

    #[test]
    fn test_edmx_rejects_foreign_type() {
        let doc = EDMX.replace("Default.agri0001", "Other.agri0001");
        let err = parse_edmx(doc.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("not in the default schema"));
    }

    #[test]
    fn test_edmx_rejects_undefined_type() {
        let doc = EDMX.replace("EntityType=\"Default.agri0001\"", "EntityType=\"Default.missing\"");
        let err = parse_edmx(doc.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("found 0"));
    }

    #[test]
    fn test_edmx_rejects_dotted_type() {
        let doc = EDMX.replace("Default.agri0001", "Default.a.b");
        let err = parse_edmx(doc.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("cannot be parsed"));
    }
}
