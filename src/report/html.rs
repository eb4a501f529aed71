use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use ego_tree::NodeId;
use html5ever::{ns, LocalName, QualName};
use scraper::{
    node::{Element, Text},
    ElementRef, Html, Node, StrTendril,
};

use crate::{
    logging,
    report::{self, Placeholder, ReportUpdate},
};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// 以 placeholder 改寫的靜態 HTML 報表
///
/// 內容以字串保存，改寫時才用 scraper 解析成節點樹，改完再序列化回字串，
/// 因此 `HtmlReport` 可以跨越 `.await` 持有。
pub struct HtmlReport {
    path: PathBuf,
    content: String,
}

impl HtmlReport {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Ok(HtmlReport { path, content })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// 找出文件中不存在的 id
    pub fn missing_ids<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let document = Html::parse_document(&self.content);

        ids.into_iter()
            .filter(|id| find(&document, &Placeholder::id(*id)).is_none())
            .map(str::to_string)
            .collect()
    }

    /// 寫入所有 placeholder，回傳實際改寫的數量
    pub fn apply(&mut self, update: &ReportUpdate) -> usize {
        let mut document = Html::parse_document(&self.content);
        let placeholders: BTreeSet<&Placeholder> =
            update.texts.keys().chain(update.classes.keys()).collect();
        let mut applied = 0;

        for placeholder in placeholders {
            let text = update.texts.get(placeholder).map(String::as_str);
            let class = update.classes.get(placeholder).map(String::as_str);

            if rewrite(&mut document, placeholder, text, class) {
                applied += 1;
            } else {
                logging::debug_file_async(format!(
                    "The placeholder {:?} not found in {}",
                    placeholder,
                    self.path.display()
                ));
            }
        }

        self.content = document.html();
        applied
    }

    pub fn save(&self) -> Result<()> {
        report::write_atomic(&self.path, self.content.as_bytes())
    }
}

/// 依文件順序找出第一個符合的元素
fn find(document: &Html, placeholder: &Placeholder) -> Option<NodeId> {
    document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| matches(element, placeholder))
        .map(|element| element.id())
}

fn matches(element: &ElementRef, placeholder: &Placeholder) -> bool {
    match placeholder {
        Placeholder::Id(id) => element.value().id() == Some(id.as_str()),
        Placeholder::Attr { name, value } => element.value().attr(name) == Some(value.as_str()),
        Placeholder::Literal(literal) => {
            element.child_elements().next().is_none()
                && element.text().collect::<String>().trim() == literal
        }
    }
}

fn rewrite(
    document: &mut Html,
    placeholder: &Placeholder,
    text: Option<&str>,
    class: Option<&str>,
) -> bool {
    let Some(node_id) = find(document, placeholder) else {
        return false;
    };
    let Some(mut node) = document.tree.get_mut(node_id) else {
        return false;
    };

    if let Some(class) = class {
        if let Node::Element(element) = node.value() {
            set_attr(element, "class", class);
        }
    }

    if let Some(text) = text {
        let is_void = node
            .value()
            .as_element()
            .is_some_and(|element| VOID_ELEMENTS.contains(&element.name()));

        if is_void {
            logging::debug_file_async(format!(
                "The placeholder {:?} is a void element, its text is left as is",
                placeholder
            ));
        } else {
            while let Some(mut child) = node.first_child() {
                child.detach();
            }
            node.append(Node::Text(Text {
                text: StrTendril::from(text),
            }));
        }
    }

    true
}

/// 覆寫屬性，沒有時補上
///
/// `Element::attr` 以二分搜尋查找，所以新屬性要插在排序後的位置。
fn set_attr(element: &mut Element, name: &str, value: &str) {
    let qualname = QualName::new(None, ns!(), LocalName::from(name));

    match element.attrs.binary_search_by(|(k, _)| k.cmp(&qualname)) {
        Ok(i) => element.attrs[i].1 = StrTendril::from(value),
        Err(i) => element.attrs.insert(i, (qualname, StrTendril::from(value))),
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use rust_decimal_macros::dec;
    use scraper::Selector;

    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
  <table>
    <tr>
      <td id="a-cost-0">2.10</td>
      <td id="a-price-0" title="price > cost">--</td>
      <td id="a-profit-0" class="profit-negative">--</td>
      <td><div id="a-current-0"><span>old</span> value</div></td>
      <td id='a-rate-0'>--</td>
    </tr>
  </table>
  <div id="a-total-value"><!-- <div> -->--</div>
  <p id="a-total-profit">keep</p>
  <input id="a-total-rate" value="0">
  <span data-field="a-total-cost">--</span>
  <p class="note">PLACEHOLDER_TIME</p>
</body>
</html>"#;

    fn report() -> HtmlReport {
        HtmlReport {
            path: PathBuf::from("index.html"),
            content: PAGE.to_string(),
        }
    }

    fn text_of(html: &str, css: &str) -> String {
        let document = Html::parse_document(html);
        let selector = Selector::parse(css).unwrap();
        document
            .select(&selector)
            .next()
            .map(|e| e.text().collect::<String>())
            .unwrap()
    }

    fn attr_of(html: &str, css: &str, attr: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let selector = Selector::parse(css).unwrap();
        document
            .select(&selector)
            .next()
            .and_then(|e| e.value().attr(attr).map(str::to_string))
    }

    #[test]
    fn test_apply_by_id() {
        let mut r = report();
        let mut update = ReportUpdate::default();
        update.set_text(Placeholder::id("a-price-0"), "2.500".to_string());
        update.set_text(Placeholder::id("a-current-0"), "297619.05".to_string());
        update.set_text(Placeholder::id("a-rate-0"), "19.05%".to_string());
        update.set_text(Placeholder::id("a-total-value"), "1.00".to_string());
        update.set_profit(Placeholder::id("a-profit-0"), dec!(47619.05));

        assert_eq!(r.apply(&update), 5);

        let html = r.content();
        assert_eq!(text_of(html, "#a-price-0"), "2.500");
        assert_eq!(attr_of(html, "#a-price-0", "title").as_deref(), Some("price > cost"));
        assert_eq!(text_of(html, "#a-current-0"), "297619.05");
        assert_eq!(text_of(html, "#a-rate-0"), "19.05%");
        assert_eq!(text_of(html, "#a-total-value"), "1.00");
        assert_eq!(text_of(html, "#a-profit-0"), "47619.05");
        assert_eq!(attr_of(html, "#a-profit-0", "class").as_deref(), Some("profit-positive"));
        // 成本欄位與相鄰元素不會被動到
        assert_eq!(text_of(html, "#a-cost-0"), "2.10");
        assert_eq!(text_of(html, "#a-total-profit"), "keep");
        assert_eq!(attr_of(html, "#a-total-rate", "value").as_deref(), Some("0"));
        assert!(html.contains("PLACEHOLDER_TIME"));
    }

    #[test]
    fn test_comment_inside_placeholder_is_replaced() {
        let mut r = HtmlReport {
            path: PathBuf::from("index.html"),
            content: r#"<div id="a-total-value"><!-- <div> -->--</div><p id="a-total-rate">keep</p>"#
                .to_string(),
        };
        let mut update = ReportUpdate::default();
        update.set_text(Placeholder::id("a-total-value"), "1.00".to_string());

        assert_eq!(r.apply(&update), 1);
        assert_eq!(text_of(r.content(), "#a-total-value"), "1.00");
        assert_eq!(text_of(r.content(), "#a-total-rate"), "keep");
        assert!(!r.content().contains("<!--"));
    }

    #[test]
    fn test_apply_by_literal() {
        let mut r = report();
        let mut update = ReportUpdate::default();
        let placeholder = Placeholder::Literal("PLACEHOLDER_TIME".to_string());
        update.set_text(placeholder.clone(), "数据更新时间: 2026-10-19 09:30:00".to_string());
        update.set_class(placeholder, "note updated");

        assert_eq!(r.apply(&update), 1);
        assert_eq!(text_of(r.content(), "p.note"), "数据更新时间: 2026-10-19 09:30:00");
        assert_eq!(attr_of(r.content(), "p.note", "class").as_deref(), Some("note updated"));
        assert!(!r.content().contains("PLACEHOLDER_TIME"));
    }

    #[test]
    fn test_apply_by_attribute() {
        let mut r = report();
        let mut update = ReportUpdate::default();
        update.set_profit(Placeholder::attr("data-field", "a-total-cost"), dec!(-3));
        update.set_text(Placeholder::attr("data-field", "a-total"), "x".to_string());

        assert_eq!(r.apply(&update), 1);
        assert_eq!(text_of(r.content(), "[data-field=a-total-cost]"), "-3.00");
        assert_eq!(
            attr_of(r.content(), "[data-field=a-total-cost]", "class").as_deref(),
            Some("profit-negative")
        );
    }

    #[test]
    fn test_missing_and_void_placeholders() {
        let mut r = report();
        let mut update = ReportUpdate::default();
        update.set_text(Placeholder::id("b-price-0"), "1".to_string());
        update.set_text(Placeholder::Literal("NOT THERE".to_string()), "1".to_string());
        update.set_text(Placeholder::id("a-total-rate"), "3.00%".to_string());
        update.set_class(Placeholder::id("a-total-rate"), "profit-positive");

        assert_eq!(r.apply(&update), 1);
        assert_eq!(attr_of(r.content(), "#a-total-rate", "class").as_deref(), Some("profit-positive"));
        assert_eq!(attr_of(r.content(), "#a-total-rate", "value").as_deref(), Some("0"));
        assert!(!r.content().contains("3.00%"));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut r = report();
        let mut update = ReportUpdate::default();
        update.set_text(Placeholder::id("a-price-0"), "<b>1 & 2</b>".to_string());
        r.apply(&update);

        assert!(r.content().contains("&lt;b&gt;1 &amp; 2&lt;/b&gt;"));
        assert_eq!(text_of(r.content(), "#a-price-0"), "<b>1 & 2</b>");
    }

    #[test]
    fn test_id_must_match_exactly() {
        let mut r = HtmlReport {
            path: PathBuf::from("index.html"),
            content: r#"<span data-id="x">no</span><span id="xy">no</span><span id="x">yes</span>"#
                .to_string(),
        };
        let mut update = ReportUpdate::default();
        update.set_text(Placeholder::id("x"), "done".to_string());
        r.apply(&update);

        assert_eq!(text_of(r.content(), "#x"), "done");
        assert_eq!(text_of(r.content(), "#xy"), "no");
        assert_eq!(text_of(r.content(), "[data-id=x]"), "no");
    }

    #[test]
    fn test_set_attr() {
        let mut document = Html::parse_fragment(r#"<span id="k">1</span><span class='x y' id="j">2</span>"#);
        for id in ["k", "j"] {
            let node_id = find(&document, &Placeholder::id(id)).unwrap();
            if let Node::Element(element) = document.tree.get_mut(node_id).unwrap().value() {
                set_attr(element, "class", "a");
            }
        }

        for id in ["k", "j"] {
            let node_id = find(&document, &Placeholder::id(id)).unwrap();
            let element = document.tree.get(node_id).unwrap().value().as_element().unwrap();
            assert_eq!(element.attr("class"), Some("a"));
            assert_eq!(element.attr("id"), Some(id));
        }
    }

    #[test]
    fn test_missing_ids() {
        let r = report();
        let missing = r.missing_ids(["a-price-0", "hk-price-0", "a-total-rate"]);
        assert_eq!(missing, vec!["hk-price-0".to_string()]);
    }

    #[test]
    fn test_load_and_save() {
        let path = env::temp_dir().join(format!("report-{}.html", std::process::id()));
        fs::write(&path, PAGE).unwrap();

        let mut r = HtmlReport::load(&path).unwrap();
        let mut update = ReportUpdate::default();
        update.set_text(Placeholder::id("a-price-0"), "2.500".to_string());
        r.apply(&update);
        r.save().unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert_eq!(text_of(&saved, "#a-price-0"), "2.500");
        assert!(saved.starts_with("<!DOCTYPE html>"));
        fs::remove_file(&path).ok();

        assert!(HtmlReport::load(&path).is_err());
    }
}
