//! Built-in widget factories

use crate::event::ChangeBinding;
use crate::registry::{WidgetContext, WidgetFactory};
use crate::widget::{Widget, WidgetKind};
use form_ir::DATE_FORMAT;
use form_schema::StringFormat;

/// Strings allowed to be longer than this render as a textarea
pub const TEXTAREA_THRESHOLD: usize = 200;

/// Text input for strings; email/url input types follow the format
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFactory;

impl WidgetFactory for TextFactory {
    fn render(&self, ctx: &WidgetContext<'_>) -> Widget {
        let constraints = &ctx.descriptor().constraints;
        let long = constraints
            .max_length
            .as_ref()
            .is_some_and(|max| max.value > TEXTAREA_THRESHOLD);

        let mut widget = if long {
            ctx.base(WidgetKind::TextArea)
        } else {
            let input_type = match constraints.format.as_ref().map(|f| f.value) {
                Some(StringFormat::Email) => "email",
                Some(StringFormat::Url) => "url",
                None => "text",
            };
            ctx.base(WidgetKind::TextInput).attr("type", input_type)
        };

        if let Some(min) = &constraints.min_length {
            widget = widget.attr("minlength", min.value);
        }
        if let Some(max) = &constraints.max_length {
            widget = widget.attr("maxlength", max.value);
        }
        if let Some(pattern) = &constraints.pattern {
            widget = widget.attr("pattern", &pattern.value);
        }
        widget
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberFactory;

impl WidgetFactory for NumberFactory {
    fn render(&self, ctx: &WidgetContext<'_>) -> Widget {
        let constraints = &ctx.descriptor().constraints;
        let mut widget = ctx.base(WidgetKind::NumberInput).attr("type", "number");

        if let Some(min) = &constraints.min {
            widget = widget.attr("min", min.value);
        }
        if let Some(max) = &constraints.max {
            widget = widget.attr("max", max.value);
        }
        match &constraints.step {
            Some(step) => widget = widget.attr("step", step.value),
            None if constraints.integer => widget = widget.attr("step", 1),
            None => {}
        }
        widget
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckboxFactory;

impl WidgetFactory for CheckboxFactory {
    fn render(&self, ctx: &WidgetContext<'_>) -> Widget {
        ctx.base(WidgetKind::Checkbox)
    }
}

/// Date input; `Today` bounds are resolved against the context's date
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFactory;

impl WidgetFactory for DateFactory {
    fn render(&self, ctx: &WidgetContext<'_>) -> Widget {
        let constraints = &ctx.descriptor().constraints;
        let today = ctx.today();
        let mut widget = ctx.base(WidgetKind::DateInput).attr("type", "date");

        if let Some(min) = &constraints.min_date {
            widget = widget.attr("min", min.value.resolve(today).format(DATE_FORMAT));
        }
        if let Some(max) = &constraints.max_date {
            widget = widget.attr("max", max.value.resolve(today).format(DATE_FORMAT));
        }
        widget
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectFactory;

impl WidgetFactory for SelectFactory {
    fn render(&self, ctx: &WidgetContext<'_>) -> Widget {
        let mut widget = ctx.base(WidgetKind::Select);
        widget.options.clone_from(&ctx.descriptor().options);
        widget
    }
}

/// Objects render as a fieldset of their members, in declaration order
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldsetFactory;

impl WidgetFactory for FieldsetFactory {
    fn render(&self, ctx: &WidgetContext<'_>) -> Widget {
        let mut widget = ctx.base(WidgetKind::Fieldset);
        widget.children = ctx
            .descriptor()
            .children
            .iter()
            .map(|child| ctx.render_child(child, ctx.path().key(child.name.clone())))
            .collect();
        widget
    }
}

/// Arrays render one item per element, each with a remove button, followed
/// by an append button
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayFactory;

impl WidgetFactory for ArrayFactory {
    fn render(&self, ctx: &WidgetContext<'_>) -> Widget {
        let path = ctx.path();
        let len = ctx.value().as_array().map_or(0, Vec::len);
        let mut widget = ctx.base(WidgetKind::ArrayList).attr("data-count", len);

        for index in 0..len {
            let item_path = path.index(index);
            let mut item = Widget::new(WidgetKind::ArrayItem, item_path.to_string());
            if let Some(element) = ctx.descriptor().element() {
                item.children.push(ctx.render_child(element, item_path));
            }
            item.children.push(Widget::button(
                "Remove",
                ChangeBinding::Remove {
                    array: path.clone(),
                    index,
                },
            ));
            widget.children.push(item);
        }

        widget
            .children
            .push(Widget::button("Add", ChangeBinding::Append(path.clone())));
        widget
    }
}
