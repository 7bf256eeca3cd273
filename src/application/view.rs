//! Presentation models for the search and saved-books pages, rendered as Markdown.

use crate::domain::model::book::{BookSummary, UserLibrary};
use crate::domain::model::id::BookId;

pub const SAVE_LABEL: &str = "Save this Book!";
pub const ALREADY_SAVED_LABEL: &str = "This book has already been saved!";

/// カードごとの保存ボタン状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveAffordance {
    pub label: &'static str,
    pub disabled: bool,
}

impl SaveAffordance {
    pub fn for_state(already_saved: bool) -> Self {
        if already_saved {
            Self {
                label: ALREADY_SAVED_LABEL,
                disabled: true,
            }
        } else {
            Self {
                label: SAVE_LABEL,
                disabled: false,
            }
        }
    }
}

/// 表示中のボタンから保存を起動できない理由。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaveBlocked {
    #[error("Book '{0}' is not in the current results. Run `search_books` first.")]
    NotInResults(BookId),
    #[error("Log in with `login` to save books.")]
    LoggedOut,
    #[error("{}", ALREADY_SAVED_LABEL)]
    AlreadySaved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCard {
    pub book: BookSummary,
    /// 未ログインならNone（ボタン自体を出さない）
    pub save: Option<SaveAffordance>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchView {
    pub query: String,
    pub cards: Vec<ResultCard>,
    /// 閉じられるインラインエラー（保存失敗時）
    pub error: Option<String>,
}

impl SearchView {
    pub fn heading(&self) -> String {
        if self.cards.is_empty() {
            "Search for a book to begin".to_string()
        } else {
            format!("Viewing {} results:", self.cards.len())
        }
    }

    pub fn card(&self, id: &str) -> Option<&ResultCard> {
        self.cards.iter().find(|c| c.book.id().as_str() == id)
    }

    /// ボタンが無い・無効な状態からは保存を起動しない。
    pub fn save_gate(&self, id: &BookId) -> Result<(), SaveBlocked> {
        let card = self
            .card(id.as_str())
            .ok_or_else(|| SaveBlocked::NotInResults(id.clone()))?;
        match card.save {
            None => Err(SaveBlocked::LoggedOut),
            Some(save) if save.disabled => Err(SaveBlocked::AlreadySaved),
            Some(_) => Ok(()),
        }
    }

    pub fn render_markdown(&self) -> String {
        let mut buf = String::from("# Search for Books!\n\n");
        if !self.query.is_empty() {
            buf.push_str(&format!("Query: {}\n\n", self.query));
        }
        buf.push_str(&format!("## {}\n\n", self.heading()));

        for card in &self.cards {
            render_book(&card.book, &mut buf);
            if let Some(save) = card.save {
                if save.disabled {
                    buf.push_str(&format!("[{}] (disabled)\n", save.label));
                } else {
                    buf.push_str(&format!(
                        "[{}] save_book {{ book_id: \"{}\" }}\n",
                        save.label,
                        card.book.id()
                    ));
                }
            }
            buf.push('\n');
        }

        if let Some(err) = &self.error {
            buf.push_str(&format!("> Error: {err}\n> (dismiss_error to clear)\n"));
        }

        buf
    }
}

/// 保存済み書籍ページ。
pub struct LibraryView<'a> {
    pub library: &'a UserLibrary,
}

impl LibraryView<'_> {
    pub fn heading(&self) -> String {
        match self.library.books.len() {
            0 => "You have no saved books!".to_string(),
            1 => "Viewing 1 saved book:".to_string(),
            n => format!("Viewing {n} saved books:"),
        }
    }

    pub fn render_markdown(&self) -> String {
        let mut buf = String::from("# Viewing saved books!\n\n");
        buf.push_str(&format!("## {}\n\n", self.heading()));
        for book in &self.library.books {
            render_book(book, &mut buf);
            buf.push_str(&format!(
                "[Delete this Book!] remove_book {{ book_id: \"{}\" }}\n\n",
                book.id()
            ));
        }
        buf
    }
}

fn render_book(book: &BookSummary, buf: &mut String) {
    buf.push_str(&format!("### {}\n", book.title()));
    if book.has_cover() {
        buf.push_str(&format!(
            "![The cover for {}]({})\n",
            book.title(),
            book.cover_image_url()
        ));
    }
    buf.push_str(&format!("Authors: {}\n", book.authors().join(", ")));
    if let Some(desc) = book.description() {
        buf.push_str(&format!("{desc}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hobbit() -> BookSummary {
        BookSummary::new(
            BookId::from("b1"),
            "The Hobbit",
            vec![],
            Some("A tale".into()),
            None,
        )
    }

    #[test]
    fn affordance_labels() {
        let open = SaveAffordance::for_state(false);
        assert_eq!(open.label, "Save this Book!");
        assert!(!open.disabled);

        let done = SaveAffordance::for_state(true);
        assert_eq!(done.label, "This book has already been saved!");
        assert!(done.disabled);
    }

    #[test]
    fn empty_view_prompts_search() {
        let view = SearchView {
            query: String::new(),
            cards: vec![],
            error: None,
        };
        assert_eq!(view.heading(), "Search for a book to begin");
    }

    #[test]
    fn cover_line_only_when_url_present() {
        let view = SearchView {
            query: String::new(),
            cards: vec![ResultCard {
                book: hobbit(),
                save: None,
            }],
            error: None,
        };
        let md = view.render_markdown();
        assert!(md.contains("## Viewing 1 results:"));
        assert!(md.contains("Authors: No author to display"));
        assert!(!md.contains("The cover for"));
        assert!(!md.contains("Save this Book!"));
    }

    #[test]
    fn disabled_affordance_has_no_action() {
        let view = SearchView {
            query: String::new(),
            cards: vec![ResultCard {
                book: hobbit(),
                save: Some(SaveAffordance::for_state(true)),
            }],
            error: None,
        };
        let md = view.render_markdown();
        assert!(md.contains("[This book has already been saved!] (disabled)"));
        assert!(!md.contains("save_book"));
    }

    #[test]
    fn save_gate_follows_affordance() {
        let view = |save| SearchView {
            query: String::new(),
            cards: vec![ResultCard {
                book: hobbit(),
                save,
            }],
            error: None,
        };
        let b1 = BookId::from("b1");

        assert_eq!(view(Some(SaveAffordance::for_state(false))).save_gate(&b1), Ok(()));
        assert_eq!(
            view(Some(SaveAffordance::for_state(true))).save_gate(&b1),
            Err(SaveBlocked::AlreadySaved)
        );
        assert_eq!(view(None).save_gate(&b1), Err(SaveBlocked::LoggedOut));
        assert_eq!(
            view(None).save_gate(&BookId::from("zz")),
            Err(SaveBlocked::NotInResults(BookId::from("zz")))
        );
        assert_eq!(
            SaveBlocked::AlreadySaved.to_string(),
            "This book has already been saved!"
        );
    }

    #[test]
    fn library_heading_pluralizes() {
        let mut lib = UserLibrary {
            username: "reader".into(),
            books: vec![],
        };
        assert_eq!(LibraryView { library: &lib }.heading(), "You have no saved books!");

        lib.books.push(hobbit());
        assert_eq!(LibraryView { library: &lib }.heading(), "Viewing 1 saved book:");

        lib.books.push(hobbit());
        assert_eq!(LibraryView { library: &lib }.heading(), "Viewing 2 saved books:");
    }
}
