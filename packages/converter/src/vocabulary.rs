//! Tag and attribute names of the persisted and rendered forms.

/// Persisted (DocBook-like) vocabulary.
pub mod xml {
    pub const SECTION: &str = "section";
    pub const PARA: &str = "para";
    pub const TITLE: &str = "title";
    pub const PROGRAMLISTING: &str = "programlisting";
    pub const ITEMIZEDLIST: &str = "itemizedlist";
    pub const ORDEREDLIST: &str = "orderedlist";
    pub const LISTITEM: &str = "listitem";
    pub const EMBED: &str = "ezembed";
    pub const EMBED_INLINE: &str = "ezembedinline";
    pub const EMBED_LINK: &str = "ezlink";
    pub const TEMPLATE: &str = "eztemplate";
    pub const TEMPLATE_CONTENT: &str = "ezcontent";
    pub const TEMPLATE_CONFIG: &str = "ezconfig";
    pub const TEMPLATE_VALUE: &str = "ezvalue";
    pub const LINK: &str = "link";
    pub const EMPHASIS: &str = "emphasis";
    pub const SUPERSCRIPT: &str = "superscript";
    pub const SUBSCRIPT: &str = "subscript";

    pub const ID: &str = "id";
    pub const XML_ID: &str = "xml:id";
    pub const LEVEL: &str = "ezxhtml:level";
    pub const CLASS: &str = "ezxhtml:class";
    pub const TARGET: &str = "ezxhtml:target";
    pub const HREF: &str = "xlink:href";
    pub const LINK_TITLE: &str = "xlink:title";
    pub const VIEW: &str = "view";
    pub const NAME: &str = "name";
    pub const KEY: &str = "key";
    pub const ROLE: &str = "role";
    pub const CUSTOM_ATTRIBUTE_PREFIX: &str = "ezattribute:";

    pub const ROLE_STRONG: &str = "strong";
    pub const ROLE_UNDERLINED: &str = "underlined";
    pub const VIEW_EMBED: &str = "embed";
    pub const VIEW_EMBED_INLINE: &str = "embed-inline";

    /// Namespace declarations carried by the root `section`.
    pub const NAMESPACES: [(&str, &str); 5] = [
        ("xmlns", "http://docbook.org/ns/docbook"),
        ("xmlns:xlink", "http://www.w3.org/1999/xlink"),
        ("xmlns:ezxhtml", "http://ibexa.co/xmlns/dxp/docbook/xhtml"),
        ("xmlns:ezcustom", "http://ibexa.co/xmlns/dxp/docbook/custom"),
        ("version", "5.0-variant ezpublish-1.0"),
    ];
}

/// Rendered view vocabulary.
pub mod html {
    pub const ROOT: &str = "div";
    pub const P: &str = "p";
    pub const PRE: &str = "pre";
    pub const UL: &str = "ul";
    pub const OL: &str = "ol";
    pub const LI: &str = "li";
    pub const DIV: &str = "div";
    pub const SPAN: &str = "span";
    pub const A: &str = "a";
    pub const EM: &str = "em";
    pub const STRONG: &str = "strong";
    pub const U: &str = "u";
    pub const SUP: &str = "sup";
    pub const SUB: &str = "sub";

    pub const ID: &str = "id";
    pub const CLASS: &str = "class";
    pub const HREF: &str = "href";
    pub const TITLE: &str = "title";
    pub const TARGET: &str = "target";
    pub const ELEMENT: &str = "data-ezelement";
    pub const VIEW: &str = "data-ezview";
    pub const TEMPLATE_NAME: &str = "data-ezname";
    pub const TEMPLATE_VALUE_KEY: &str = "data-ezvalue-key";
    pub const CUSTOM_ATTRIBUTE_PREFIX: &str = "data-ezattribute-";
    pub const ROOT_MARKER: &str = "data-richtext-root";

    pub fn heading(level: u8) -> String {
        format!("h{}", level.clamp(1, 6))
    }
}

/// Marker class of image-typed inline embeds, which are not supported inline.
pub const IMAGE_EMBED_CLASS: &str = "ibexa-embed-type-image";
