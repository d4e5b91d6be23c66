// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mapper programs for remote analyses.
//!
//! A mapper runs on the backend once per analysis point with `input`
//! bound to `{ point, time, pauseId }` and `sendCommand` available for
//! inspection. It returns a list of `{ key, value }` entries; every mapper
//! here returns at most one entry whose value decodes as
//! [`crate::logpoint::LogpointValue`].

use serde_json::Value;

const PRELUDE: &str = r#"
const { point, time, pauseId } = input;
const pauseData = { frames: [], scopes: [], objects: [] };
function addPauseData(data) {
  if (!data) return;
  for (const kind of ["frames", "scopes", "objects"]) {
    if (data[kind]) pauseData[kind].push(...data[kind]);
  }
}
function isFalsy(v) {
  if (!v) return true;
  if (v.object) return false;
  if (v.unserializableNumber) return v.unserializableNumber === "NaN" || v.unserializableNumber === "-0";
  if (v.bigint) return v.bigint === "0";
  return !("value" in v) || !v.value;
}
function pointText(p) {
  const base = p.checkpoint + ":" + p.progress;
  const at = p.position;
  return at ? base + ":" + [at.kind, at.script, at.offset, at.frameIndex].join(":") : base;
}
const { frame: topFrameId, data: topData } = sendCommand("Pause.getTopFrame", {});
addPauseData(topData);
const topFrame = topFrameId && topData.frames.find(f => f.frameId == topFrameId);
const location = topFrame ? topFrame.location : [];
const displayName = (topFrame && topFrame.functionName) || "";
function evaluateRaw(expression, bindings) {
  const { result } = sendCommand("Pause.evaluateInFrame", { frameId: topFrameId, expression, bindings: bindings || [] });
  addPauseData(result.data);
  return result;
}
function evaluate(expression) {
  const result = evaluateRaw(expression);
  if (result.returned) return result.returned;
  return { value: result.exception ? "Error: exception thrown" : "Error: evaluation failed" };
}
function evaluateList(expression, bindings) {
  const result = evaluateRaw(expression, bindings);
  if (!result.returned) return [result.exception || { value: "Error: evaluation failed" }];
  const { object } = result.returned;
  if (!object) return [result.returned];
  const { result: length } = sendCommand("Pause.getObjectProperty", { object, name: "length" });
  addPauseData(length.data);
  const values = [];
  for (let i = 0; i < length.returned.value; i++) {
    const { result: element } = sendCommand("Pause.getObjectProperty", { object, name: String(i) });
    addPauseData(element.data);
    values.push(element.returned);
  }
  return values;
}
function emit(fields) {
  return [{ key: point, value: Object.assign({ time, pauseId, location, data: pauseData }, fields) }];
}
"#;

/// Evaluated in the handler's frame: collects the framework handlers for
/// the event's type from the props frameworks attach to the target and its
/// ancestors, as an object of functions, or `undefined` when there are
/// none.
const FRAMEWORK_LISTENERS: &str = r#"(() => {
  const event = arguments[0];
  if (!event || !event.target || typeof event.type != "string") return undefined;
  const name = "on" + event.type.toLowerCase();
  const listeners = {};
  let count = 0;
  for (let node = event.target; node; node = node.parentNode) {
    for (const key of Object.keys(node)) {
      if (!key.startsWith("__reactProps$") && !key.startsWith("__reactEventHandlers$")) continue;
      const props = node[key] || {};
      for (const prop of Object.keys(props)) {
        if (prop.toLowerCase() == name && typeof props[prop] == "function") {
          listeners[count++] = props[prop];
        }
      }
    }
  }
  return count ? listeners : undefined;
})()"#;

fn literal(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

/// Mapper for a source logpoint. `text` is a comma-separated list of
/// expressions, evaluated as one array with `displayName` bound to the
/// top frame's function name; each element becomes one value. With
/// `condition`, a falsy or `undefined` result yields no entry.
pub fn logpoint(text: &str, condition: Option<&str>) -> String {
    let guard = condition.map_or_else(String::new, |condition| {
        format!(
            "if (isFalsy(evaluate({}))) return [];\n",
            literal(condition)
        )
    });
    format!(
        "{PRELUDE}{guard}const values = evaluateList({}, [{{ name: \"displayName\", value: displayName }}]);\nreturn emit({{ values }});\n",
        literal(&format!("[{text}]"))
    )
}

/// Mapper for event-handler entry points, logging every handler argument.
/// With `framework_listeners`, the handlers UI frameworks registered for
/// the event are also collected and reported as an object of functions.
pub fn event_logpoint(framework_listeners: bool) -> String {
    let listeners = if framework_listeners {
        format!(
            r#"
let frameworkListeners;
const found = evaluateRaw({}).returned;
if (found && found.object) {{
  frameworkListeners = found;
  const {{ data }} = sendCommand("Pause.getObjectPreview", {{ object: found.object }});
  addPauseData(data);
}}
return emit({{ values, frameworkListeners }});
"#,
            literal(FRAMEWORK_LISTENERS)
        )
    } else {
        "\nreturn emit({ values });\n".to_string()
    };
    format!("{PRELUDE}const values = evaluateList(\"[...arguments]\");{listeners}")
}

/// Mapper for exception points: reports the thrown value.
pub fn exception_logpoint() -> String {
    format!(
        r#"{PRELUDE}const {{ exception, data }} = sendCommand("Pause.getExceptionValue", {{}});
addPauseData(data);
return emit({{ values: [{{ value: "Exception" }}, exception] }});
"#
    )
}

/// Mapper for random sample points: logs one string of the form
/// `"<point>: <arguments>"`, with the arguments truncated to 200
/// characters.
pub fn random_points() -> String {
    format!(
        r#"{PRELUDE}const args = evaluateRaw("String([...arguments]).substring(0, 200)").returned;
const text = args ? String(args.value) : "";
return emit({{ values: [{{ value: pointText(point) + ": " + text }}] }});
"#
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn logpoint_text_is_evaluated_as_an_array() {
        let mapper = logpoint("\"x is\", x", None);
        assert!(mapper.contains(r#"evaluateList("[\"x is\", x]""#));
        assert!(mapper.contains(r#"name: "displayName""#));
        assert!(!mapper.contains("return [];"));
    }

    #[test]
    fn condition_guards_emission() {
        let mapper = logpoint("x", Some("x > 2"));
        let guard = mapper.find("isFalsy(evaluate(\"x > 2\"))").unwrap();
        let emit = mapper.rfind("return emit(").unwrap();
        assert!(guard < emit);
    }

    #[test]
    fn event_mapper_logs_every_argument() {
        for framework in [true, false] {
            assert!(event_logpoint(framework).contains(r#"evaluateList("[...arguments]")"#));
        }
    }

    #[test]
    fn framework_variant_collects_listeners_from_the_target() {
        let mapper = event_logpoint(true);
        assert!(mapper.contains("frameworkListeners"));
        assert!(mapper.contains("__reactProps$"));
        assert!(mapper.contains("node.parentNode"));
        assert!(mapper.contains("Pause.getObjectPreview"));
        assert!(!event_logpoint(false).contains("frameworkListeners"));
    }

    #[test]
    fn random_points_log_point_and_arguments() {
        let mapper = random_points();
        assert!(mapper.contains(r#"pointText(point) + ": " + text"#));
        assert!(mapper.contains("String([...arguments]).substring(0, 200)"));
        assert!(!mapper.contains("values: []"));
    }
}
