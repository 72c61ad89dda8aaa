//! Patches run parameters into the workflow configuration XML.
//!
//! The workflow ships a configuration template (`cactus_workflow_config.xml`)
//! whose defaults cover every knob. Only the axes a [`Params`] actually sets
//! are written; everything else streams through untouched, so a default
//! parameter set leaves the template semantically unchanged.
//!
//! Patching is done in two passes over `quick-xml` event streams: a survey
//! pass that validates the template shape and locates the blast/base
//! iteration tail, then a rewrite pass that emits the patched document.

use crate::error::{BenchError, Result};
use crate::params::Params;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::path::Path;

/// Renders a boolean the way the workflow's own configuration spells them.
fn xml_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Per-iteration facts gathered by the survey pass.
#[derive(Debug, Default)]
struct IterationInfo {
    kind: String,
    number: String,
    has_core: bool,
}

/// Template shape facts needed to validate and drive the rewrite.
#[derive(Debug, Default)]
struct Survey {
    iterations: Vec<IterationInfo>,
    has_outgroup: bool,
    has_coverage: bool,
    has_decomposition: bool,
}

/// Element path below the document root, e.g. `["multi_cactus", "outgroup"]`.
fn rel_path(stack: &[String]) -> &[String] {
    if stack.is_empty() {
        stack
    } else {
        &stack[1..]
    }
}

fn attr_value(elem: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in elem.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn survey(template: &str, source: &Path) -> Result<Survey> {
    let mut reader = Reader::from_str(template);
    let mut stack: Vec<String> = Vec::new();
    let mut survey = Survey::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                survey_element(&mut survey, rel_path(&stack), &e)?;
            }
            Event::Empty(e) => {
                let mut path = stack.clone();
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                survey_element(&mut survey, rel_path(&path), &e)?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let n = survey.iterations.len();
    if n < 2 {
        return Err(BenchError::XmlShape {
            path: source.to_path_buf(),
            detail: format!("expected at least two alignment iterations, found {n}"),
        });
    }
    let caf = &survey.iterations[n - 2];
    if caf.kind != "blast" || caf.number != "0" {
        return Err(BenchError::XmlShape {
            path: source.to_path_buf(),
            detail: format!(
                "second-to-last iteration must be type=\"blast\" number=\"0\", \
                 found type={:?} number={:?}",
                caf.kind, caf.number
            ),
        });
    }
    if !caf.has_core {
        return Err(BenchError::XmlShape {
            path: source.to_path_buf(),
            detail: "blast iteration has no core element".to_string(),
        });
    }
    let bar = &survey.iterations[n - 1];
    if bar.kind != "base" || bar.number != "1" {
        return Err(BenchError::XmlShape {
            path: source.to_path_buf(),
            detail: format!(
                "last iteration must be type=\"base\" number=\"1\", \
                 found type={:?} number={:?}",
                bar.kind, bar.number
            ),
        });
    }
    for (present, name) in [
        (survey.has_outgroup, "multi_cactus/outgroup"),
        (survey.has_coverage, "multi_cactus/coverage"),
        (survey.has_decomposition, "multi_cactus/decomposition"),
    ] {
        if !present {
            return Err(BenchError::XmlShape {
                path: source.to_path_buf(),
                detail: format!("missing {name} element"),
            });
        }
    }
    Ok(survey)
}

fn survey_element(survey: &mut Survey, rel: &[String], elem: &BytesStart) -> Result<()> {
    let as_strs: Vec<&str> = rel.iter().map(String::as_str).collect();
    match as_strs.as_slice() {
        ["multi_cactus", "outgroup"] => survey.has_outgroup = true,
        ["multi_cactus", "coverage"] => survey.has_coverage = true,
        ["multi_cactus", "decomposition"] => survey.has_decomposition = true,
        ["alignment", "iterations", "iteration"] => {
            survey.iterations.push(IterationInfo {
                kind: attr_value(elem, b"type")?.unwrap_or_default(),
                number: attr_value(elem, b"number")?.unwrap_or_default(),
                has_core: false,
            });
        }
        ["alignment", "iterations", "iteration", "core"] => {
            if let Some(last) = survey.iterations.last_mut() {
                last.has_core = true;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Attribute overrides for one element, computed from the parameter set.
fn overrides_for(
    params: &Params,
    rel: &[String],
    iteration_idx: usize,
    total_iterations: usize,
) -> Vec<(&'static str, String)> {
    let mut out: Vec<(&'static str, String)> = Vec::new();
    let as_strs: Vec<&str> = rel.iter().map(String::as_str).collect();
    match as_strs.as_slice() {
        ["multi_cactus", "outgroup"] => {
            if let Some(s) = params.outgroup_strategy {
                out.push(("strategy", s.as_str().to_string()));
            }
        }
        ["multi_cactus", "coverage"] => {
            if let Some(f) = params.required_fraction {
                out.push(("required_fraction", f.to_string()));
            }
            if let Some(s) = params.single_copy_strategy {
                out.push(("single_copy_strategy", s.as_str().to_string()));
            }
        }
        ["multi_cactus", "decomposition"] => {
            if let Some(b) = params.self_alignment {
                out.push(("self_alignment", xml_bool(b).to_string()));
            }
            if let Some(n) = params.subtree_size {
                out.push(("subtree_size", n.to_string()));
            }
        }
        ["alignment", "iterations", "iteration"] => {
            // the base (bar) iteration is the last one
            if iteration_idx == total_iterations {
                if let Some(d) = params.min_block_degree {
                    out.push(("minimumBlockDegree", d.to_string()));
                }
            }
        }
        ["alignment", "iterations", "iteration", "core"] => {
            // the blast (caf) iteration is second to last
            if iteration_idx == total_iterations - 1 {
                if let Some(l) = params.min_chain_length {
                    out.push(("minimumChainLength", l.to_string()));
                }
                if let Some(g) = params.max_group_size {
                    out.push(("maximumGroupSize", g.to_string()));
                }
            }
        }
        _ => {}
    }
    out
}

/// Rebuilds an element with the given attribute overrides applied.
///
/// Overridden attributes keep their original position; overrides with no
/// existing attribute are appended at the end.
fn rewrite_element(elem: &BytesStart, overrides: &[(&'static str, String)]) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(name);
    let mut consumed = vec![false; overrides.len()];

    for attr in elem.attributes() {
        let attr = attr?;
        let position = overrides
            .iter()
            .position(|(key, _)| key.as_bytes() == attr.key.as_ref());
        match position {
            Some(i) => {
                rebuilt.push_attribute((overrides[i].0, overrides[i].1.as_str()));
                consumed[i] = true;
            }
            None => {
                let value = attr.unescape_value()?.into_owned();
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                rebuilt.push_attribute((key.as_str(), value.as_str()));
            }
        }
    }
    for (i, (key, value)) in overrides.iter().enumerate() {
        if !consumed[i] {
            rebuilt.push_attribute((*key, value.as_str()));
        }
    }
    Ok(rebuilt)
}

/// Patches `params` into the configuration template text.
///
/// `source` only labels error messages; the template itself comes in as a
/// string so callers can patch both files and embedded fixtures.
pub fn patch_config(template: &str, params: &Params, source: &Path) -> Result<String> {
    params.validate()?;
    let shape = survey(template, source)?;
    let total_iterations = shape.iterations.len();

    let mut reader = Reader::from_str(template);
    let mut writer = Writer::new(Vec::new());
    let mut stack: Vec<String> = Vec::new();
    let mut iteration_idx = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                let rel = rel_path(&stack).to_vec();
                if rel.last().map(String::as_str) == Some("iteration")
                    && rel.as_slice()[..rel.len() - 1] == ["alignment".to_string(), "iterations".to_string()]
                {
                    iteration_idx += 1;
                }
                let overrides = overrides_for(params, &rel, iteration_idx, total_iterations);
                if overrides.is_empty() {
                    writer.write_event(Event::Start(e.to_owned()))?;
                } else {
                    writer.write_event(Event::Start(rewrite_element(&e, &overrides)?))?;
                }
            }
            Event::Empty(e) => {
                let mut path = stack.clone();
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                let rel = rel_path(&path).to_vec();
                if rel.last().map(String::as_str) == Some("iteration")
                    && rel.as_slice()[..rel.len() - 1] == ["alignment".to_string(), "iterations".to_string()]
                {
                    iteration_idx += 1;
                }
                let overrides = overrides_for(params, &rel, iteration_idx, total_iterations);
                if overrides.is_empty() {
                    writer.write_event(Event::Empty(e.to_owned()))?;
                } else {
                    writer.write_event(Event::Empty(rewrite_element(&e, &overrides)?))?;
                }
            }
            Event::End(e) => {
                stack.pop();
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

/// Reads a template file, patches it, and writes the result.
pub fn patch_config_file(template: &Path, output: &Path, params: &Params) -> Result<()> {
    if !template.exists() {
        return Err(BenchError::FileNotFound(template.to_path_buf()));
    }
    let text = fs::read_to_string(template)?;
    let patched = patch_config(&text, params, template)?;
    fs::write(output, patched)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{OutgroupStrategy, SingleCopyStrategy};
    use std::path::PathBuf;

    const TEMPLATE: &str = r#"<?xml version="1.0" ?>
<cactus_workflow_config>
  <multi_cactus>
    <outgroup strategy="none"/>
    <coverage required_fraction="0" single_copy_strategy="none"/>
    <decomposition self_alignment="False" subtree_size="2"/>
  </multi_cactus>
  <alignment>
    <iterations>
      <iteration type="preprocess" number="-1"/>
      <iteration type="blast" number="0">
        <core minimumChainLength="2" maximumGroupSize="100"/>
      </iteration>
      <iteration type="base" number="1" minimumBlockDegree="2"/>
    </iterations>
  </alignment>
</cactus_workflow_config>
"#;

    fn src() -> PathBuf {
        PathBuf::from("template.xml")
    }

    #[test]
    fn patches_every_set_axis() {
        let params = Params::builder()
            .min_chain_length(8)
            .min_block_degree(4)
            .max_group_size(500)
            .outgroup_strategy(OutgroupStrategy::Greedy)
            .single_copy_strategy(SingleCopyStrategy::All)
            .required_fraction(0.67)
            .self_alignment(true)
            .subtree_size(3)
            .build();
        let patched = patch_config(TEMPLATE, &params, &src()).unwrap();
        assert!(patched.contains(r#"strategy="greedy""#));
        assert!(patched.contains(r#"required_fraction="0.67""#));
        assert!(patched.contains(r#"single_copy_strategy="all""#));
        assert!(patched.contains(r#"self_alignment="True""#));
        assert!(patched.contains(r#"subtree_size="3""#));
        assert!(patched.contains(r#"minimumChainLength="8""#));
        assert!(patched.contains(r#"maximumGroupSize="500""#));
        assert!(patched.contains(r#"minimumBlockDegree="4""#));
        // the preprocess iteration is not the blast tail and stays untouched
        assert!(patched.contains(r#"<iteration type="preprocess" number="-1"/>"#));
    }

    #[test]
    fn default_params_leave_template_attributes_alone() {
        let patched = patch_config(TEMPLATE, &Params::default(), &src()).unwrap();
        assert!(patched.contains(r#"strategy="none""#));
        assert!(patched.contains(r#"required_fraction="0""#));
        assert!(patched.contains(r#"minimumChainLength="2""#));
        assert!(patched.contains(r#"minimumBlockDegree="2""#));
    }

    #[test]
    fn missing_core_is_a_shape_error() {
        let template = TEMPLATE.replace(
            r#"<core minimumChainLength="2" maximumGroupSize="100"/>"#,
            "",
        );
        let err = patch_config(&template, &Params::default(), &src()).unwrap_err();
        assert!(matches!(err, BenchError::XmlShape { .. }));
    }

    #[test]
    fn wrong_iteration_tail_is_a_shape_error() {
        let template = TEMPLATE.replace(r#"type="base" number="1""#, r#"type="base" number="2""#);
        let err = patch_config(&template, &Params::default(), &src()).unwrap_err();
        match err {
            BenchError::XmlShape { detail, .. } => assert!(detail.contains("last iteration")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn single_iteration_template_is_rejected() {
        let template = r#"<config><alignment><iterations>
            <iteration type="base" number="1"/>
        </iterations></alignment></config>"#;
        assert!(patch_config(template, &Params::default(), &src()).is_err());
    }

    #[test]
    fn new_attribute_is_appended_when_template_lacks_it() {
        let template = TEMPLATE.replace(r#" minimumBlockDegree="2""#, "");
        let params = Params::builder().min_block_degree(6).build();
        let patched = patch_config(&template, &params, &src()).unwrap();
        assert!(patched.contains(r#"minimumBlockDegree="6""#));
    }
}
