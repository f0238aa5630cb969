use super::{SchemaAttributes, SchemaEntry, SchemaGlobal, SchemaRule, SchemaType, SchemaValue};

/// Rules for the markup the bundled editor produces on its own.
///
/// Plugins add their tags on top of these.
pub fn default_rules() -> Vec<SchemaEntry> {
    let mut entries: Vec<SchemaEntry> = vec![
        SchemaGlobal::new(
            SchemaType::Block,
            SchemaAttributes::new()
                .attr("data-id", "*")
                .style(
                    "text-align",
                    SchemaValue::one_of(["left", "center", "right", "justify"]),
                )
                .style("padding-left", "@length"),
        )
        .into(),
        SchemaRule::block("p").allow_in(["blockquote"]).into(),
    ];

    for level in 1..=6 {
        entries.push(SchemaRule::block(format!("h{level}")).into());
    }

    entries.extend([
        SchemaRule::block("blockquote").can_merge(true).into(),
        SchemaRule::block("ul").into(),
        SchemaRule::block("ol").into(),
        SchemaRule::block("li").allow_in(["ul", "ol"]).into(),
        SchemaRule::block("hr").void().into(),
        SchemaRule::inline("br").void().into(),
        SchemaRule::inline("a")
            .with_attributes(
                SchemaAttributes::new()
                    .attr("href", "@url")
                    .attr("target", SchemaValue::one_of(["_blank", "_self", "_parent", "_top"]))
                    .attr("title", "*"),
            )
            .into(),
        SchemaRule::inline("img")
            .void()
            .with_attributes(
                SchemaAttributes::new()
                    .attr("src", "@url")
                    .attr("alt", "*")
                    .attr("width", "@length")
                    .attr("height", "@length"),
            )
            .into(),
    ]);

    for mark in ["strong", "b", "em", "i", "u", "s", "del", "code", "sub", "sup"] {
        entries.push(SchemaRule::mark(mark).into());
    }

    entries.extend([
        SchemaRule::mark("span")
            .with_attributes(
                SchemaAttributes::new().style("color", SchemaValue::required("@color")),
            )
            .into(),
        SchemaRule::mark("span")
            .with_attributes(
                SchemaAttributes::new().style("background-color", SchemaValue::required("@color")),
            )
            .into(),
    ]);

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    #[test]
    fn test_defaults_load() {
        let schema = Schema::with_defaults();
        let data = schema.data();
        assert_eq!(data.blocks.len(), 12);
        assert_eq!(data.inlines.len(), 3);
        assert_eq!(data.marks.len(), 12);
        assert!(data.globals.contains_key(&SchemaType::Block));
        // The two coloured spans carry a required style and lead the search order.
        assert_eq!(schema.rules()[0].name, "span");
        assert_eq!(schema.rules()[1].name, "span");
    }
}
