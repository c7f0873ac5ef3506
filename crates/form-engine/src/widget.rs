//! Rendered widget tree and its markup serialization

use crate::event::ChangeBinding;
use form_ir::FormValue;
use std::fmt::Write;

const INDENT: &str = "  ";

/// Kind of a rendered widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Form,
    TextInput,
    TextArea,
    NumberInput,
    Checkbox,
    DateInput,
    Select,
    Fieldset,
    ArrayList,
    ArrayItem,
    Button,
    /// Placeholder for a field type without a registered factory
    Unsupported,
}

/// A node of the rendered, framework-neutral widget tree
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub kind: WidgetKind,
    /// Field path as text; empty for the form root and buttons
    pub id: String,
    pub label: String,
    pub help_text: Option<String>,
    pub value: FormValue,
    pub error: Option<String>,
    pub required: bool,
    /// An asynchronous check is running for this field
    pub validating: bool,
    /// Extra input attributes in emission order (`type`, `min`, `maxlength`, ...)
    pub attributes: Vec<(String, String)>,
    /// Choices of a select
    pub options: Vec<String>,
    pub binding: Option<ChangeBinding>,
    pub children: Vec<Widget>,
}

impl Widget {
    #[must_use]
    pub fn new(kind: WidgetKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            label: String::new(),
            help_text: None,
            value: FormValue::Null,
            error: None,
            required: false,
            validating: false,
            attributes: Vec::new(),
            options: Vec::new(),
            binding: None,
            children: Vec::new(),
        }
    }

    /// Clickable button emitting `binding`
    #[must_use]
    pub fn button(label: impl Into<String>, binding: ChangeBinding) -> Self {
        let mut button = Self::new(WidgetKind::Button, "");
        button.label = label.into();
        button.binding = Some(binding);
        button
    }

    /// Set an attribute, replacing an earlier value for the same name
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        let name = name.into();
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First widget in this subtree (self included) with the given id
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Widget> {
        let mut stack = vec![self];
        while let Some(widget) = stack.pop() {
            if widget.id == id {
                return Some(widget);
            }
            stack.extend(widget.children.iter().rev());
        }
        None
    }

    /// Number of widgets in this subtree, self included
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Widget::count).sum::<usize>()
    }

    /// Serialize the subtree as indented HTML-like markup
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out, 0);
        out
    }

    fn write_markup(&self, out: &mut String, depth: usize) {
        let pad = INDENT.repeat(depth);
        match self.kind {
            WidgetKind::Form => {
                let _ = writeln!(out, "{pad}<form{}>", self.attrs_markup());
                if !self.label.is_empty() {
                    let _ = writeln!(out, "{pad}{INDENT}<h2>{}</h2>", escape(&self.label));
                }
                self.children_markup(out, depth + 1);
                let _ = writeln!(out, "{pad}</form>");
            }
            WidgetKind::Fieldset => {
                let _ = writeln!(out, "{pad}<fieldset id=\"{}\">", escape(&self.id));
                let _ = writeln!(out, "{pad}{INDENT}<legend>{}</legend>", escape(&self.label));
                self.notes_markup(out, depth + 1);
                self.children_markup(out, depth + 1);
                let _ = writeln!(out, "{pad}</fieldset>");
            }
            WidgetKind::ArrayList => {
                let _ = writeln!(out, "{pad}<section id=\"{}\" class=\"array\">", escape(&self.id));
                let _ = writeln!(out, "{pad}{INDENT}<h4>{}{}</h4>", escape(&self.label), self.marker());
                self.notes_markup(out, depth + 1);
                self.children_markup(out, depth + 1);
                let _ = writeln!(out, "{pad}</section>");
            }
            WidgetKind::ArrayItem => {
                let _ = writeln!(out, "{pad}<div id=\"{}\" class=\"array-item\">", escape(&self.id));
                self.children_markup(out, depth + 1);
                let _ = writeln!(out, "{pad}</div>");
            }
            WidgetKind::Button => {
                let (kind, action) = match &self.binding {
                    Some(ChangeBinding::Submit) => ("submit", "submit"),
                    Some(binding) => ("button", binding.action()),
                    None => ("button", "none"),
                };
                let target = match &self.binding {
                    Some(ChangeBinding::Append(path)) => format!(" data-target=\"{}\"", escape(&path.to_string())),
                    Some(ChangeBinding::Remove { array, index }) => {
                        format!(" data-target=\"{}\" data-index=\"{index}\"", escape(&array.to_string()))
                    }
                    _ => String::new(),
                };
                let _ = writeln!(
                    out,
                    "{pad}<button type=\"{kind}\" data-action=\"{action}\"{target}>{}</button>",
                    escape(&self.label)
                );
            }
            WidgetKind::Unsupported => {
                let _ = writeln!(
                    out,
                    "{pad}<div id=\"{}\" class=\"unsupported\">{}: {}</div>",
                    escape(&self.id),
                    escape(&self.label),
                    escape(self.error.as_deref().unwrap_or_default())
                );
            }
            WidgetKind::TextArea => {
                self.label_markup(out, depth);
                let _ = writeln!(
                    out,
                    "{pad}<textarea{}>{}</textarea>",
                    self.control_attrs(),
                    escape(&self.value.display_string())
                );
                self.notes_markup(out, depth);
            }
            WidgetKind::Select => {
                self.label_markup(out, depth);
                let _ = writeln!(out, "{pad}<select{}>", self.control_attrs());
                let current = self.value.as_str();
                let placeholder = if current.is_none() { " selected" } else { "" };
                let _ = writeln!(out, "{pad}{INDENT}<option value=\"\"{placeholder}>Select...</option>");
                for option in &self.options {
                    let selected = if current == Some(option.as_str()) { " selected" } else { "" };
                    let _ = writeln!(
                        out,
                        "{pad}{INDENT}<option value=\"{0}\"{selected}>{0}</option>",
                        escape(option)
                    );
                }
                let _ = writeln!(out, "{pad}</select>");
                self.notes_markup(out, depth);
            }
            WidgetKind::Checkbox => {
                let checked = if self.value.as_bool() == Some(true) { " checked" } else { "" };
                let _ = writeln!(out, "{pad}<input type=\"checkbox\"{}{checked}>", self.control_attrs());
                self.label_markup(out, depth);
                self.notes_markup(out, depth);
            }
            WidgetKind::TextInput | WidgetKind::NumberInput | WidgetKind::DateInput => {
                self.label_markup(out, depth);
                let _ = writeln!(
                    out,
                    "{pad}<input{} value=\"{}\">",
                    self.control_attrs(),
                    escape(&self.value.display_string())
                );
                self.notes_markup(out, depth);
            }
        }
    }

    fn children_markup(&self, out: &mut String, depth: usize) {
        for child in &self.children {
            child.write_markup(out, depth);
        }
    }

    fn marker(&self) -> &'static str {
        if self.required { " *" } else { "" }
    }

    fn label_markup(&self, out: &mut String, depth: usize) {
        let _ = writeln!(
            out,
            "{}<label for=\"{}\">{}{}</label>",
            INDENT.repeat(depth),
            escape(&self.id),
            escape(&self.label),
            self.marker()
        );
    }

    fn notes_markup(&self, out: &mut String, depth: usize) {
        let pad = INDENT.repeat(depth);
        if let Some(help) = &self.help_text {
            let _ = writeln!(out, "{pad}<small>{}</small>", escape(help));
        }
        if self.validating {
            let _ = writeln!(out, "{pad}<p class=\"status\">Validating...</p>");
        }
        if let Some(error) = &self.error {
            let _ = writeln!(out, "{pad}<p class=\"error\">{}</p>", escape(error));
        }
    }

    fn attrs_markup(&self) -> String {
        self.attributes
            .iter()
            .map(|(name, value)| format!(" {name}=\"{}\"", escape(value)))
            .collect()
    }

    fn control_attrs(&self) -> String {
        let mut attrs = format!(" id=\"{0}\" name=\"{0}\"", escape(&self.id));
        attrs.push_str(&self.attrs_markup());
        if self.required {
            attrs.push_str(" required");
        }
        if self.validating {
            attrs.push_str(" aria-busy=\"true\"");
        }
        if self.error.is_some() {
            attrs.push_str(" aria-invalid=\"true\"");
        }
        attrs
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_ir::FieldPath;

    fn text_input() -> Widget {
        let mut widget = Widget::new(WidgetKind::TextInput, "personalInfo.fullName")
            .attr("type", "text")
            .attr("minlength", 2);
        widget.label = "Full Name".to_string();
        widget.help_text = Some("Enter your full name".to_string());
        widget.required = true;
        widget.value = FormValue::from("A");
        widget.error = Some("Name must be at least 2 characters".to_string());
        widget
    }

    #[test]
    fn test_text_input_markup() {
        let markup = text_input().to_markup();
        assert_eq!(
            markup,
            "<label for=\"personalInfo.fullName\">Full Name *</label>\n\
             <input id=\"personalInfo.fullName\" name=\"personalInfo.fullName\" type=\"text\" minlength=\"2\" required aria-invalid=\"true\" value=\"A\">\n\
             <small>Enter your full name</small>\n\
             <p class=\"error\">Name must be at least 2 characters</p>\n"
        );
    }

    #[test]
    fn test_markup_escapes_text() {
        let mut widget = Widget::new(WidgetKind::TextInput, "bio");
        widget.label = "Bio".to_string();
        widget.value = FormValue::from("<b>\"hi\" & bye</b>");
        assert!(
            widget
                .to_markup()
                .contains("value=\"&lt;b&gt;&quot;hi&quot; &amp; bye&lt;/b&gt;\"")
        );
    }

    #[test]
    fn test_attr_replaces_existing() {
        let widget = Widget::new(WidgetKind::NumberInput, "age")
            .attr("min", 0)
            .attr("min", 18);
        assert_eq!(widget.attribute("min"), Some("18"));
        assert_eq!(widget.attributes.len(), 1);
    }

    #[test]
    fn test_find_and_count() {
        let mut fieldset = Widget::new(WidgetKind::Fieldset, "personalInfo");
        fieldset.children.push(text_input());
        let mut form = Widget::new(WidgetKind::Form, "");
        form.children.push(fieldset);
        form.children.push(Widget::button("Submit", ChangeBinding::Submit));

        assert_eq!(form.count(), 4);
        assert_eq!(
            form.find("personalInfo.fullName").map(|w| w.kind),
            Some(WidgetKind::TextInput)
        );
        assert!(form.find("missing").is_none());
        assert!(
            form.to_markup()
                .contains("<button type=\"submit\" data-action=\"submit\">Submit</button>")
        );
    }

    #[test]
    fn test_remove_button_markup() {
        let button = Widget::button(
            "Remove",
            ChangeBinding::Remove {
                array: FieldPath::parse("tags").unwrap(),
                index: 2,
            },
        );
        assert_eq!(
            button.to_markup(),
            "<button type=\"button\" data-action=\"remove\" data-target=\"tags\" data-index=\"2\">Remove</button>\n"
        );
    }

    #[test]
    fn test_select_marks_current_option() {
        let mut select = Widget::new(WidgetKind::Select, "priority");
        select.label = "Priority".to_string();
        select.options = vec!["low".to_string(), "high".to_string()];
        select.value = FormValue::from("high");
        let markup = select.to_markup();
        assert!(markup.contains("<option value=\"\">Select...</option>"));
        assert!(markup.contains("<option value=\"high\" selected>high</option>"));
    }
}
