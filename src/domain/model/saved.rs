use super::id::BookId;

/// 保存済みIDの集合。追加のみで削除はしない。
/// キャッシュファイルの内容が安定するよう、最初に追加された順序を保持する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedIdSet {
    ids: Vec<BookId>,
}

impl SavedIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 重複を除いて構築する。
    pub fn from_ids(ids: impl IntoIterator<Item = BookId>) -> Self {
        let mut set = Self::new();
        for id in ids {
            set.insert(id);
        }
        set
    }

    /// 追加した場合 true。既存IDなら何もしない。
    pub fn insert(&mut self, id: BookId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn contains(&self, id: &BookId) -> bool {
        self.ids.iter().any(|x| x == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[BookId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookId> {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut set = SavedIdSet::new();
        assert!(set.insert(BookId::from("a")));
        assert!(!set.insert(BookId::from("a")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn from_ids_dedupes_and_keeps_order() {
        let set = SavedIdSet::from_ids(["b", "a", "b", "c"].map(BookId::from));
        let ids: Vec<&str> = set.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn empty_set() {
        let set = SavedIdSet::new();
        assert!(set.is_empty());
        assert!(!set.contains(&BookId::from("a")));
    }
}
