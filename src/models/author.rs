// src/models/author.rs

use serde::Serialize;

/// One of the sixteen result categories of the quiz.
#[derive(Debug, Clone, Serialize)]
pub struct Author {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
}

/// The full result table, in the order the legacy quiz shipped it.
pub const AUTHORS: [Author; 16] = [
    Author { id: "dazai", name: "太宰治", kind: "破産型タイプ", description: "" },
    Author { id: "akutagawa", name: "芥川龍之介", kind: "繊細タイプ", description: "" },
    Author { id: "natume", name: "夏目漱石", kind: "権威タイプ", description: "" },
    Author { id: "ougai", name: "森鷗外", kind: "博学タイプ", description: "" },
    Author { id: "itiyou", name: "樋口一葉", kind: "天才タイプ", description: "" },
    Author { id: "siga", name: "志賀直哉", kind: "金持ちタイプ", description: "" },
    Author { id: "saneatu", name: "武者小路実篤", kind: "愚直タイプ", description: "" },
    Author { id: "tanizaki", name: "谷崎潤一郎", kind: "変態タイプ", description: "" },
    Author { id: "kahuu", name: "永井荷風", kind: "性欲タイプ", description: "" },
    Author { id: "simada", name: "島田清次郎", kind: "刹那タイプ", description: "" },
    Author { id: "kikuti", name: "菊池寛", kind: "ビジネスタイプ", description: "" },
    Author { id: "kazii", name: "梶井基次郎", kind: "センスタイプ", description: "" },
    Author { id: "kouyou", name: "尾崎紅葉", kind: "親分タイプ", description: "" },
    Author { id: "bizan", name: "川上眉山", kind: "無冠の天才タイプ", description: "" },
    Author { id: "ranpo", name: "江戸川乱歩", kind: "放浪タイプ", description: "" },
    Author { id: "zenzou", name: "葛西善蔵", kind: "ほろ酔いタイプ", description: "" },
];

/// Looks up an author by its id.
pub fn find_author(id: &str) -> Option<&'static Author> {
    AUTHORS.iter().find(|author| author.id == id)
}

/// Transient candidate produced while scoring a sub-branch.
/// Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorCandidate {
    pub author: &'static str,
    pub points: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_author_ids_are_unique() {
        let ids: HashSet<&str> = AUTHORS.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 16);
    }

    #[test]
    fn test_find_author() {
        assert_eq!(find_author("dazai").map(|a| a.name), Some("太宰治"));
        assert!(find_author("soseki").is_none());
    }
}
