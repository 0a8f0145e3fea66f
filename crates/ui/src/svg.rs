//! SVG serialization of primitive trees.

use crate::renderer::RenderError;
use crate::scene::{Primitive, SceneNode, Style};
use annotator_model::{Point, Rect};
use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use std::io::{Cursor, Write};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Serializes `nodes` inside a `width` x `height` overlay root.
///
/// `root_attributes` are copied onto the root element in order.
pub fn to_svg(
    width: f64,
    height: f64,
    root_attributes: &[(String, String)],
    nodes: &[SceneNode],
) -> Result<String, RenderError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut root = BytesStart::new("svg");
    root.push_attribute(("xmlns", SVG_NAMESPACE));
    root.push_attribute(("width", number(width).as_str()));
    root.push_attribute(("height", number(height).as_str()));
    for (name, value) in root_attributes {
        root.push_attribute((name.as_str(), value.as_str()));
    }
    writer.write_event(Event::Start(root))?;

    for node in nodes {
        write_node(&mut writer, node)?;
    }

    writer.write_event(Event::End(BytesEnd::new("svg")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

/// Serializes a single tree without a root element.
pub fn node_to_svg(node: &SceneNode) -> Result<String, RenderError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_node(&mut writer, node)?;
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &SceneNode) -> Result<(), RenderError> {
    let name = element_name(&node.primitive);
    let mut elem = BytesStart::new(name);

    if let Some((id, kind)) = &node.annotation {
        elem.push_attribute(("data-pdf-annotate-id", id.as_str()));
        elem.push_attribute(("data-pdf-annotate-type", kind.as_str()));
    }
    if let Some(transform) = &node.transform {
        elem.push_attribute(("transform", transform.to_svg().as_str()));
    }
    push_geometry(&mut elem, &node.primitive);
    push_style(&mut elem, &node.style);

    let text = match &node.primitive {
        Primitive::Text { content, .. } => Some(content.as_str()),
        _ => None,
    };

    if node.children.is_empty() && text.is_none() {
        writer.write_event(Event::Empty(elem))?;
        return Ok(());
    }

    writer.write_event(Event::Start(elem))?;
    if let Some(text) = text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn element_name(primitive: &Primitive) -> &'static str {
    match primitive {
        Primitive::Group => "g",
        Primitive::Rect(_) => "rect",
        Primitive::Line { .. } => "line",
        Primitive::Text { .. } => "text",
        Primitive::Path { .. } | Primitive::Glyph { .. } => "path",
        Primitive::Surface { .. } => "svg",
    }
}

fn push_geometry(elem: &mut BytesStart<'_>, primitive: &Primitive) {
    match primitive {
        Primitive::Group => {}
        Primitive::Rect(rect) => push_rect(elem, rect),
        Primitive::Line { start, end } => {
            elem.push_attribute(("x1", number(start.x).as_str()));
            elem.push_attribute(("y1", number(start.y).as_str()));
            elem.push_attribute(("x2", number(end.x).as_str()));
            elem.push_attribute(("y2", number(end.y).as_str()));
        }
        Primitive::Text { origin, .. } => {
            elem.push_attribute(("x", number(origin.x).as_str()));
            elem.push_attribute(("y", number(origin.y).as_str()));
        }
        Primitive::Path { points, closed } => {
            elem.push_attribute(("d", path_data(points, *closed).as_str()));
        }
        Primitive::Glyph { data } => elem.push_attribute(("d", *data)),
        Primitive::Surface { frame, view_box } => {
            push_rect(elem, frame);
            if let Some(view_box) = view_box {
                let value = format!(
                    "{} {} {} {}",
                    number(view_box.x),
                    number(view_box.y),
                    number(view_box.width),
                    number(view_box.height)
                );
                elem.push_attribute(("viewBox", value.as_str()));
            }
        }
    }
}

fn push_rect(elem: &mut BytesStart<'_>, rect: &Rect) {
    elem.push_attribute(("x", number(rect.x).as_str()));
    elem.push_attribute(("y", number(rect.y).as_str()));
    elem.push_attribute(("width", number(rect.width).as_str()));
    elem.push_attribute(("height", number(rect.height).as_str()));
}

fn push_style(elem: &mut BytesStart<'_>, style: &Style) {
    if let Some(fill) = &style.fill {
        elem.push_attribute(("fill", fill.as_str()));
    }
    if let Some(opacity) = style.fill_opacity {
        elem.push_attribute(("fill-opacity", number(opacity).as_str()));
    }
    if let Some(stroke) = &style.stroke {
        elem.push_attribute(("stroke", stroke.as_str()));
    }
    if let Some(width) = style.stroke_width {
        elem.push_attribute(("stroke-width", number(width).as_str()));
    }
    if let Some(size) = style.font_size {
        elem.push_attribute(("font-size", number(size).as_str()));
    }
}

/// `M x y L x y ... [Z]`
fn path_data(points: &[Point], closed: bool) -> String {
    let mut data = String::new();
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            data.push(' ');
        }
        data.push(if i == 0 { 'M' } else { 'L' });
        data.push_str(&format!("{} {}", number(point.x), number(point.y)));
    }
    if closed && !points.is_empty() {
        data.push_str(" Z");
    }
    data
}

fn number(value: f64) -> String {
    // Negative zero prints as "-0".
    if value == 0.0 {
        return "0".to_owned();
    }
    value.to_string()
}
