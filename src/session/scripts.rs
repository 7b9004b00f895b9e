//! Page-side element registry
//!
//! Elements found over CDP are kept in `window.__chaser` of the top-level
//! document and addressed by ref id (`el-N`). Every call returns a JSON
//! envelope: `{"ok": value}` or `{"error": kind, "message": text}`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::cdp::traits::EvaluationResult;
use crate::{Error, Result};

/// Installs `window.__chaser` unless already present
pub const REGISTRY_SCRIPT: &str = r#"
if (!window.__chaser) {
    window.__chaser = (() => {
        const refs = new Map();
        const ids = new WeakMap();
        let next = 1;

        const fail = (kind, message) => {
            const e = new Error(message);
            e.kind = kind;
            return e;
        };

        const put = (el) => {
            let id = ids.get(el);
            if (!id) {
                id = 'el-' + next++;
                ids.set(el, id);
                refs.set(id, el);
            }
            return id;
        };

        const get = (id) => {
            const el = refs.get(id);
            if (!el || !el.isConnected) {
                refs.delete(id);
                if (el) ids.delete(el);
                throw fail('stale', id);
            }
            return el;
        };

        // Detached elements can never be used again
        const prune = () => {
            for (const [id, el] of refs) {
                if (!el.isConnected) {
                    refs.delete(id);
                    ids.delete(el);
                }
            }
        };

        const doc = (frames) => {
            let d = document;
            for (const id of frames) {
                const frame = get(id);
                d = frame.contentDocument;
                if (!d) throw fail('frame', id);
            }
            return d;
        };

        const text = (el) => (el.innerText !== undefined ? el.innerText : el.textContent || '');

        const all = (root) => Array.from(root.querySelectorAll('*'));

        const query = (root, using, value) => {
            switch (using) {
                case 'css':
                    try {
                        return Array.from(root.querySelectorAll(value));
                    } catch (e) {
                        throw fail('selector', e.message);
                    }
                case 'id':
                    return all(root).filter((el) => el.id === value);
                case 'name':
                    return all(root).filter((el) => el.getAttribute('name') === value);
                case 'className':
                    if (/\s/.test(value)) throw fail('selector', 'Compound class names not permitted: ' + value);
                    return all(root).filter((el) => el.classList.contains(value));
                case 'tagName':
                    return Array.from(root.getElementsByTagName(value));
                case 'linkText':
                    return Array.from(root.querySelectorAll('a')).filter((el) => text(el).trim() === value);
                case 'partialLinkText':
                    return Array.from(root.querySelectorAll('a')).filter((el) => text(el).includes(value));
                case 'xpath': {
                    const owner = root.ownerDocument || root;
                    let snapshot;
                    try {
                        snapshot = owner.evaluate(value, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                    } catch (e) {
                        throw fail('selector', e.message);
                    }
                    const found = [];
                    for (let i = 0; i < snapshot.snapshotLength; i++) {
                        const node = snapshot.snapshotItem(i);
                        if (node.nodeType === 1) found.push(node);
                    }
                    return found;
                }
                default:
                    throw fail('selector', 'Unsupported strategy ' + using);
            }
        };

        const frameList = (d) => Array.from(d.querySelectorAll('iframe, frame'));

        const enterable = (el) => {
            if (!/^i?frame$/i.test(el.tagName) || !el.contentDocument) throw fail('frame', el.tagName);
            return put(el);
        };

        const fire = (el, ...types) => types.forEach((t) => el.dispatchEvent(new Event(t, { bubbles: true })));

        return {
            find: (frames, parent, using, value) => {
                prune();
                return query(parent ? get(parent) : doc(frames), using, value).map(put);
            },

            frameByIndex: (frames, index) => {
                const el = frameList(doc(frames))[index];
                if (!el) throw fail('frame', 'index ' + index);
                return enterable(el);
            },

            frameByName: (frames, name) => {
                const el = frameList(doc(frames)).find((f) => f.name === name || f.id === name);
                if (!el) throw fail('frame', name);
                return enterable(el);
            },

            frameElement: (id) => enterable(get(id)),

            frameAlive: (frames) => {
                doc(frames);
                return true;
            },

            tag: (id) => get(id).tagName.toLowerCase(),

            text: (id) => text(get(id)),

            attr: (id, name) => {
                const el = get(id);
                if (name === 'value' && 'value' in el) return String(el.value);
                if (['checked', 'selected', 'disabled'].includes(name)) return el[name] ? 'true' : null;
                return el.getAttribute(name);
            },

            box: (id) => {
                const el = get(id);
                const r = el.getBoundingClientRect();
                let x = r.left;
                let y = r.top;
                let w = el.ownerDocument.defaultView;
                while (w && w.frameElement) {
                    const f = w.frameElement.getBoundingClientRect();
                    x += f.left + w.frameElement.clientLeft;
                    y += f.top + w.frameElement.clientTop;
                    w = w.parent;
                }
                return { x, y, width: r.width, height: r.height };
            },

            scroll: (id) => {
                get(id).scrollIntoView({ block: 'center', inline: 'center' });
                return null;
            },

            displayed: (id) => {
                const el = get(id);
                const style = el.ownerDocument.defaultView.getComputedStyle(el);
                if (style.display === 'none' || style.visibility === 'hidden') return false;
                const r = el.getBoundingClientRect();
                return r.width > 0 && r.height > 0;
            },

            enabled: (id) => !get(id).disabled,

            selected: (id) => {
                const el = get(id);
                return !!(el.checked || el.selected);
            },

            focus: (id) => {
                get(id).focus();
                return null;
            },

            clear: (id) => {
                const el = get(id);
                if (el.isContentEditable) el.textContent = '';
                else el.value = '';
                fire(el, 'input', 'change');
                return null;
            },

            select: (id, by, value) => {
                const el = get(id);
                if (el.tagName !== 'SELECT') throw fail('script', 'Element is not a <select>: ' + el.tagName);
                const options = Array.from(el.options);
                const index =
                    by === 'index' ? (value < options.length ? value : -1)
                    : by === 'value' ? options.findIndex((o) => o.value === value)
                    : options.findIndex((o) => o.text.trim() === value);
                if (index < 0) throw fail('missing', 'No option with ' + by + ' ' + value);
                options[index].selected = true;
                fire(el, 'input', 'change');
                return null;
            },

            selectedOptions: (id) => {
                const el = get(id);
                if (el.tagName !== 'SELECT') throw fail('script', 'Element is not a <select>: ' + el.tagName);
                return Array.from(el.selectedOptions).map((o) => o.text.trim());
            },
        };
    })();
}
"#;

/// Build an expression calling registry operation `op` with `args`
pub fn call(op: &str, args: &[Value]) -> String {
    format!(
        r#"(() => {{
{registry}
try {{
    return JSON.stringify({{ ok: window.__chaser.{op}(...{args}) }});
}} catch (e) {{
    return JSON.stringify({{ error: (e && e.kind) || 'script', message: String((e && e.message) || e) }});
}}
}})()"#,
        registry = REGISTRY_SCRIPT,
        op = op,
        args = Value::Array(args.to_vec()),
    )
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: Value,
    error: Option<String>,
    #[serde(default)]
    message: String,
}

/// Decode the envelope returned by a [`call`] expression
pub fn decode<T: DeserializeOwned>(result: EvaluationResult) -> Result<T> {
    let EvaluationResult::String(json) = result else {
        return Err(Error::script_execution_failed(format!(
            "Unexpected registry result: {:?}",
            result
        )));
    };

    let envelope: Envelope = serde_json::from_str(&json)?;
    match envelope.error.as_deref() {
        None => Ok(serde_json::from_value(envelope.ok)?),
        Some("stale") => Err(Error::stale_element(envelope.message)),
        Some("frame") => Err(Error::no_such_frame(envelope.message)),
        Some("selector") => Err(Error::invalid_selector(envelope.message)),
        Some("missing") => Err(Error::element_not_found(envelope.message)),
        Some(_) => Err(Error::script_execution_failed(envelope.message)),
    }
}
