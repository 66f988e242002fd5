use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use roxmltree::{Document, Node};

use super::types::{DataError, DataErrorCode, MonsterTemplate, SourceLocation};

pub(crate) const DEFAULT_MONSTER_MOVE_SPEED: f32 = 0.2;
pub(crate) const DEFAULT_MONSTER_MAX_HP: u32 = 50;

/// Parses a `<Defs>` document of `<MonsterDef>` entries. Ids and codes must be
/// unique within the document.
pub fn parse_monster_defs(file_path: &Path, raw: &str) -> Result<Vec<MonsterTemplate>, DataError> {
    let doc = Document::parse(raw).map_err(|error| DataError {
        code: DataErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(error_at_node(
            DataErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut seen_ids = HashSet::<i32>::new();
    let mut seen_codes = HashSet::<String>::new();
    let mut templates = Vec::<MonsterTemplate>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "MonsterDef" {
            return Err(error_at_node(
                DataErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; expected <MonsterDef>",
                    child.tag_name().name()
                ),
                file_path,
                &doc,
                child,
            ));
        }
        let template = parse_monster_def(file_path, &doc, child)?;
        if !seen_ids.insert(template.id) || !seen_codes.insert(template.code.clone()) {
            return Err(error_at_node(
                DataErrorCode::DuplicateDef,
                format!(
                    "duplicate MonsterDef id {} / code '{}'",
                    template.id, template.code
                ),
                file_path,
                &doc,
                child,
            ));
        }
        templates.push(template);
    }

    Ok(templates)
}

fn parse_monster_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<MonsterTemplate, DataError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut id: Option<i32> = None;
    let mut code: Option<String> = None;
    let mut name: Option<String> = None;
    let mut move_speed: Option<f32> = None;
    let mut max_hp: Option<u32> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                DataErrorCode::DuplicateField,
                format!("duplicate field <{}> in <MonsterDef>", field_name),
                file_path,
                doc,
                field,
            ));
        }

        match field_name.as_str() {
            "id" => {
                id = Some(parse_number::<i32>(file_path, doc, field, "id")?);
            }
            "code" => {
                code = Some(required_text(file_path, doc, field, "code")?);
            }
            "name" => {
                name = Some(required_text(file_path, doc, field, "name")?);
            }
            "moveSpeed" => {
                let parsed = parse_number::<f32>(file_path, doc, field, "moveSpeed")?;
                if !parsed.is_finite() || parsed < 0.0 {
                    return Err(error_at_node(
                        DataErrorCode::InvalidValue,
                        "moveSpeed must be finite and >= 0".to_string(),
                        file_path,
                        doc,
                        field,
                    ));
                }
                move_speed = Some(parsed);
            }
            "maxHp" => {
                max_hp = Some(parse_number::<u32>(file_path, doc, field, "maxHp")?);
            }
            _ => {
                return Err(error_at_node(
                    DataErrorCode::UnknownField,
                    format!("unknown field <{}> in <MonsterDef>", field_name),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let Some(id) = id else {
        return Err(missing_field(file_path, doc, node, "id"));
    };
    let Some(code) = code else {
        return Err(missing_field(file_path, doc, node, "code"));
    };

    Ok(MonsterTemplate {
        id,
        name: name.unwrap_or_else(|| code.clone()),
        code,
        move_speed: move_speed.unwrap_or(DEFAULT_MONSTER_MOVE_SPEED),
        max_hp: max_hp.unwrap_or(DEFAULT_MONSTER_MAX_HP),
    })
}

fn parse_number<T: FromStr>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<T, DataError> {
    let value = required_text(file_path, doc, node, field_name)?;
    value.parse::<T>().map_err(|_| {
        error_at_node(
            DataErrorCode::InvalidValue,
            format!("{} '{}' is not a valid number", field_name, value),
            file_path,
            doc,
            node,
        )
    })
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, DataError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            DataErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn missing_field(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> DataError {
    error_at_node(
        DataErrorCode::MissingField,
        format!("missing required field <{}> in <MonsterDef>", field_name),
        file_path,
        doc,
        node,
    )
}

fn error_at_node(
    code: DataErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> DataError {
    let pos = doc.text_pos_at(node.range().start);
    DataError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Vec<MonsterTemplate>, DataError> {
        parse_monster_defs(Path::new("monsters.xml"), raw)
    }

    #[test]
    fn valid_defs_parse_with_defaults() {
        let defs = parse(
            r#"<Defs>
                <MonsterDef><id>1002</id><code>PORING</code><name>Poring</name><moveSpeed>0.4</moveSpeed><maxHp>60</maxHp></MonsterDef>
                <MonsterDef><id>1000</id><code>WARP</code></MonsterDef>
            </Defs>"#,
        )
        .expect("parse");
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].code, "PORING");
        assert!((defs[0].move_speed - 0.4).abs() < f32::EPSILON);
        assert_eq!(defs[0].max_hp, 60);
        assert_eq!(defs[1].name, "WARP");
        assert!((defs[1].move_speed - DEFAULT_MONSTER_MOVE_SPEED).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_id_reports_location() {
        let err = parse(r#"<Defs><MonsterDef><code>A</code></MonsterDef></Defs>"#).expect_err("err");
        assert_eq!(err.code, DataErrorCode::MissingField);
        assert!(err.location.is_some());
        assert!(err.file_path.ends_with("monsters.xml"));
    }

    #[test]
    fn unknown_field_errors() {
        let err = parse(r#"<Defs><MonsterDef><id>1</id><code>A</code><mood>Happy</mood></MonsterDef></Defs>"#)
            .expect_err("err");
        assert_eq!(err.code, DataErrorCode::UnknownField);
    }

    #[test]
    fn negative_move_speed_errors() {
        let err = parse(r#"<Defs><MonsterDef><id>1</id><code>A</code><moveSpeed>-1</moveSpeed></MonsterDef></Defs>"#)
            .expect_err("err");
        assert_eq!(err.code, DataErrorCode::InvalidValue);
    }

    #[test]
    fn non_numeric_id_errors() {
        let err = parse(r#"<Defs><MonsterDef><id>abc</id><code>A</code></MonsterDef></Defs>"#)
            .expect_err("err");
        assert_eq!(err.code, DataErrorCode::InvalidValue);
    }

    #[test]
    fn duplicate_code_errors() {
        let err = parse(
            r#"<Defs>
                <MonsterDef><id>1</id><code>A</code></MonsterDef>
                <MonsterDef><id>2</id><code>A</code></MonsterDef>
            </Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, DataErrorCode::DuplicateDef);
    }

    #[test]
    fn wrong_root_errors() {
        let err = parse(r#"<Monsters/>"#).expect_err("err");
        assert_eq!(err.code, DataErrorCode::InvalidRoot);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse(r#"<Defs><MonsterDef><id>1</id></Defs>"#).expect_err("err");
        assert_eq!(err.code, DataErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }
}
