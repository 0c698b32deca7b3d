/// 语录类型：聊天中可见的名称与接口使用的类别 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteType {
    pub label: &'static str,
    pub id: &'static str,
}

/// 接口支持的全部语录类型，按展示顺序排列。
///
/// "伤感语录" 在接口文档里出现了两次（2 与 12），这里原样保留，
/// 由 [`QuoteCatalog::from_entries`] 负责去重。
pub const BUILTIN_QUOTE_TYPES: &[(&str, &str)] = &[
    ("爱情语录", "1"),
    ("伤感语录", "2"),
    ("励志语录", "3"),
    ("友情语录", "4"),
    ("唯美语录", "5"),
    ("经典语录", "6"),
    ("搞笑语录", "7"),
    ("说说语录", "8"),
    ("心情语录", "9"),
    ("优美语录", "10"),
    ("人生语录", "11"),
    ("伤感语录", "12"),
    ("非主流语录", "13"),
    ("个性语录", "14"),
    ("温柔语录", "15"),
    ("甜蜜语录", "16"),
];

/// 不可变的有序语录类型表，名称唯一
#[derive(Debug, Clone)]
pub struct QuoteCatalog {
    entries: Vec<QuoteType>,
}

impl QuoteCatalog {
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_QUOTE_TYPES)
    }

    /// 由 (名称, ID) 列表构建。
    ///
    /// 重复的名称保留首次出现的位置，ID 取最后一次出现的值，并输出警告。
    pub fn from_entries(raw: &[(&'static str, &'static str)]) -> Self {
        let mut entries: Vec<QuoteType> = Vec::with_capacity(raw.len());

        for &(label, id) in raw {
            match entries.iter_mut().find(|e| e.label == label) {
                Some(existing) => {
                    warn!(
                        target: "Yulu",
                        "语录类型 {} 重复定义 (ID {} -> {})，仅保留后者",
                        label,
                        existing.id,
                        id
                    );
                    existing.id = id;
                }
                None => entries.push(QuoteType { label, id }),
            }
        }

        Self { entries }
    }

    /// 精确匹配名称
    pub fn get(&self, label: &str) -> Option<&QuoteType> {
        self.entries.iter().find(|e| e.label == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuoteType> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_labels_are_unique() {
        let catalog = QuoteCatalog::builtin();
        let labels: HashSet<_> = catalog.labels().collect();

        assert_eq!(catalog.iter().count(), 15);
        assert_eq!(labels.len(), catalog.iter().count());
    }

    #[test]
    fn duplicate_keeps_first_position_and_last_id() {
        let catalog = QuoteCatalog::builtin();
        let labels: Vec<_> = catalog.labels().collect();

        assert_eq!(labels[1], "伤感语录");
        assert_eq!(catalog.get("伤感语录").map(|q| q.id), Some("12"));
        assert!(catalog.iter().all(|q| q.id != "2"));
    }

    #[test]
    fn lookup_is_exact() {
        let catalog = QuoteCatalog::builtin();

        assert_eq!(catalog.get("甜蜜语录").map(|q| q.id), Some("16"));
        assert!(catalog.get("甜蜜").is_none());
        assert!(catalog.get(" 甜蜜语录").is_none());
    }

    #[test]
    fn keeps_declaration_order() {
        let catalog = QuoteCatalog::from_entries(&[("b", "2"), ("a", "1"), ("b", "3")]);
        let labels: Vec<_> = catalog.labels().collect();

        assert_eq!(labels, vec!["b", "a"]);
        assert_eq!(catalog.get("b").map(|q| q.id), Some("3"));
    }
}
