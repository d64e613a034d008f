use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::{Document, Node};
use tracing::info;

use crate::world::{Component, DisplayMessage, Rgb, SightRadius};
use crate::AppPaths;

use super::database::{ThingDef, ThingDefDatabase, ThingDefId};
use super::discovery::discover_content_sources;
use super::types::{ContentDiscoveryError, ContentRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    UnknownComponent,
    DuplicateComponent,
    DuplicateDefInMod,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub mod_id: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (mod={}, file={}, line={}, column={})",
                self.code,
                self.message,
                self.mod_id,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (mod={}, file={})",
                self.code,
                self.message,
                self.mod_id,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

/// Per-document context so every error carries mod, file and position.
struct DocContext<'a, 'input> {
    mod_id: &'a str,
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl DocContext<'_, '_> {
    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            mod_id: self.mod_id.to_string(),
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

/// Compiles every `<ThingDef>` from base content and the enabled mods.
///
/// A defName may appear once per mod; a later mod overrides an earlier one.
pub fn compile_thing_defs(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<ThingDefDatabase, ContentCompileError> {
    let sources = discover_content_sources(app_paths, request)
        .map_err(|error| map_discovery_error(error, &app_paths.root))?;

    let mut merged = BTreeMap::<String, ThingDef>::new();

    for source in sources {
        if !source.source_dir.is_dir() {
            continue;
        }
        let xml_files = collect_xml_files_sorted(&source.source_dir)
            .map_err(|error| read_error(&source.mod_id, error.path, error.source))?;
        let mut seen_in_mod = HashSet::<String>::new();

        for xml_file in &xml_files {
            let raw = fs::read_to_string(xml_file)
                .map_err(|source_err| read_error(&source.mod_id, xml_file.clone(), source_err))?;
            let defs = parse_defs_document(&source.mod_id, xml_file, &raw)?;
            for def in defs {
                if !seen_in_mod.insert(def.def_name.clone()) {
                    return Err(ContentCompileError {
                        code: ContentErrorCode::DuplicateDefInMod,
                        message: format!(
                            "duplicate ThingDef '{}' in mod '{}'; each mod may define a defName only once",
                            def.def_name, source.mod_id
                        ),
                        mod_id: source.mod_id.clone(),
                        file_path: xml_file.clone(),
                        location: None,
                    });
                }
                merged.insert(def.def_name.clone(), def);
            }
        }
        info!(
            mod_id = %source.mod_id,
            load_index = source.load_index,
            xml_file_count = xml_files.len(),
            "content_source_compiled"
        );
    }

    Ok(ThingDefDatabase::from_thing_defs(
        merged.into_values().collect(),
    ))
}

pub(crate) fn parse_defs_document(
    mod_id: &str,
    file_path: &Path,
    raw: &str,
) -> Result<Vec<ThingDef>, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        mod_id: mod_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = DocContext {
        mod_id,
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            root,
        ));
    }

    let mut defs = Vec::<ThingDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "ThingDef" {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; only <ThingDef> is supported",
                    child.tag_name().name()
                ),
                child,
            ));
        }
        defs.push(parse_thing_def(&ctx, child)?);
    }

    Ok(defs)
}

fn parse_thing_def(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<ThingDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut def_name: Option<String> = None;
    let mut origin_id: Option<u32> = None;
    let mut label: Option<String> = None;
    let mut components: Option<Vec<Component>> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(ctx.error_at(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <ThingDef>", field_name),
                field,
            ));
        }

        match field_name.as_str() {
            "defName" => def_name = Some(required_text(ctx, field, "defName")?),
            "label" => label = Some(required_text(ctx, field, "label")?),
            "originId" => {
                let value = required_text(ctx, field, "originId")?;
                let parsed = value.parse::<u32>().map_err(|_| {
                    ctx.error_at(
                        ContentErrorCode::InvalidValue,
                        format!("originId '{}' is not a non-negative integer", value),
                        field,
                    )
                })?;
                origin_id = Some(parsed);
            }
            "components" => components = Some(parse_components(ctx, field)?),
            _ => {
                return Err(ctx.error_at(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <ThingDef>", field_name),
                    field,
                ))
            }
        }
    }

    let missing = |name: &str| {
        ctx.error_at(
            ContentErrorCode::MissingField,
            format!("missing required field <{}> in <ThingDef>", name),
            node,
        )
    };
    let def_name = def_name.ok_or_else(|| missing("defName"))?;
    let origin_id = origin_id.ok_or_else(|| missing("originId"))?;
    let label = label.ok_or_else(|| missing("label"))?;
    let components = components.ok_or_else(|| missing("components"))?;

    Ok(ThingDef {
        id: ThingDefId(0),
        def_name,
        origin_id,
        label,
        components,
    })
}

fn parse_components(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Vec<Component>, ContentCompileError> {
    let mut components = Vec::<Component>::new();
    for child in node.children().filter(|child| child.is_element()) {
        let component = parse_component(ctx, child)?;
        if components
            .iter()
            .any(|existing| existing.kind() == component.kind())
        {
            return Err(ctx.error_at(
                ContentErrorCode::DuplicateComponent,
                format!("component <{}> is declared twice", component.kind()),
                child,
            ));
        }
        components.push(component);
    }
    if components.is_empty() {
        return Err(ctx.error_at(
            ContentErrorCode::MissingField,
            "<components> must declare at least one component".to_string(),
            node,
        ));
    }
    Ok(components)
}

fn parse_component(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Component, ContentCompileError> {
    let tag = node.tag_name().name();
    let component = match tag {
        "Renderable" => {
            expect_attrs(ctx, node, &["glyph", "color"])?;
            let glyph_text = required_attr(ctx, node, "glyph")?;
            let mut chars = glyph_text.chars();
            let glyph = match (chars.next(), chars.next()) {
                (Some(glyph), None) => glyph,
                _ => {
                    return Err(ctx.error_at(
                        ContentErrorCode::InvalidValue,
                        format!("glyph '{}' must be exactly one character", glyph_text),
                        node,
                    ))
                }
            };
            let color = parse_rgb(ctx, node, required_attr(ctx, node, "color")?)?;
            Component::Renderable { glyph, color }
        }
        "Named" => {
            expect_attrs(ctx, node, &["name"])?;
            Component::Named {
                name: required_attr(ctx, node, "name")?.to_string(),
            }
        }
        "Trap" => {
            expect_attrs(ctx, node, &["damage", "armed"])?;
            Component::Trap {
                damage: parse_attr(ctx, node, "damage")?,
                armed: optional_attr(ctx, node, "armed")?.unwrap_or(true),
            }
        }
        "Structure" => {
            expect_attrs(ctx, node, &["kind"])?;
            Component::Structure {
                kind: required_attr(ctx, node, "kind")?.to_string(),
            }
        }
        "Health" => {
            expect_attrs(ctx, node, &["max", "current"])?;
            let max: u32 = parse_attr(ctx, node, "max")?;
            let current = optional_attr(ctx, node, "current")?.unwrap_or(max);
            if current > max {
                return Err(ctx.error_at(
                    ContentErrorCode::InvalidValue,
                    format!("Health current {} exceeds max {}", current, max),
                    node,
                ));
            }
            Component::Health { current, max }
        }
        "Blocker" => {
            expect_attrs(ctx, node, &[])?;
            Component::Blocker
        }
        "SightRadius" => {
            expect_attrs(ctx, node, &["radius"])?;
            Component::SightRadius(SightRadius::new(parse_attr(ctx, node, "radius")?))
        }
        "UiOption" => {
            expect_attrs(ctx, node, &["key", "enabled"])?;
            Component::UiOption {
                key: required_attr(ctx, node, "key")?.to_string(),
                enabled: optional_attr(ctx, node, "enabled")?.unwrap_or(false),
            }
        }
        "Message" => {
            expect_attrs(ctx, node, &["text", "color"])?;
            let text = required_attr(ctx, node, "text")?.to_string();
            let color = match node.attribute("color") {
                Some(raw) => Some(parse_rgb(ctx, node, raw)?),
                None => None,
            };
            Component::Message(DisplayMessage { text, color })
        }
        "Treasure" => {
            expect_attrs(ctx, node, &["gold"])?;
            Component::Treasure {
                gold: parse_attr(ctx, node, "gold")?,
            }
        }
        _ => {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownComponent,
                format!("unknown component <{}>", tag),
                node,
            ))
        }
    };
    Ok(component)
}

fn expect_attrs(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    allowed: &[&str],
) -> Result<(), ContentCompileError> {
    for attr in node.attributes() {
        if !allowed.contains(&attr.name()) {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownField,
                format!(
                    "unknown attribute '{}' on <{}>",
                    attr.name(),
                    node.tag_name().name()
                ),
                node,
            ));
        }
    }
    Ok(())
}

fn required_attr<'a>(
    ctx: &DocContext<'_, '_>,
    node: Node<'a, '_>,
    name: &str,
) -> Result<&'a str, ContentCompileError> {
    match node.attribute(name).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ctx.error_at(
            ContentErrorCode::MissingField,
            format!(
                "<{}> requires a non-empty '{}' attribute",
                node.tag_name().name(),
                name
            ),
            node,
        )),
    }
}

fn parse_attr<T: FromStr>(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<T, ContentCompileError> {
    let raw = required_attr(ctx, node, name)?;
    raw.parse::<T>().map_err(|_| {
        ctx.error_at(
            ContentErrorCode::InvalidValue,
            format!(
                "attribute '{}' on <{}> has invalid value '{}'",
                name,
                node.tag_name().name(),
                raw
            ),
            node,
        )
    })
}

fn optional_attr<T: FromStr>(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<Option<T>, ContentCompileError> {
    if node.attribute(name).is_none() {
        return Ok(None);
    }
    parse_attr(ctx, node, name).map(Some)
}

fn parse_rgb(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    raw: &str,
) -> Result<Rgb, ContentCompileError> {
    let channels = raw
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>();
    match channels.as_deref() {
        Ok([r, g, b]) => Ok(Rgb::new(*r, *g, *b)),
        _ => Err(ctx.error_at(
            ContentErrorCode::InvalidValue,
            format!("color '{}' must be three 0-255 channels like '200,40,40'", raw),
            node,
        )),
    }
}

fn required_text(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(ctx.error_at(
            ContentErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            node,
        ));
    }
    Ok(value)
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<(String, PathBuf)>::new();
    collect_recursive(root, root, &mut files)?;
    files.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn collect_recursive(
    root: &Path,
    current: &Path,
    files: &mut Vec<(String, PathBuf)>,
) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(root, &path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            let key = normalize_rel_path(path.strip_prefix(root).unwrap_or(path.as_path()));
            files.push((key, path));
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(mod_id: &str, path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML content: {source}"),
        mod_id: mod_id.to_string(),
        file_path: path,
        location: None,
    }
}

fn map_discovery_error(error: ContentDiscoveryError, root: &Path) -> ContentCompileError {
    match error {
        ContentDiscoveryError::EnabledModMissing {
            mod_id,
            expected_dir,
        } => ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: format!(
                "enabled mod '{}' not found at {}; check enabled mod list",
                mod_id,
                expected_dir.display()
            ),
            mod_id,
            file_path: expected_dir,
            location: None,
        },
        other => ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: other.to_string(),
            mod_id: "<discovery>".to_string(),
            file_path: root.to_path_buf(),
            location: None,
        },
    }
}
