/// Scene corpus: fixed fact tables and the deterministic template builder.
///
/// Every template is assembled from one entry of each table. The table
/// index for template `i` is `i * k mod len` with a different `k` per table,
/// so neighbouring templates rarely share a facet combination even though
/// each table cycles on its own.
use once_cell::sync::Lazy;

use crate::core::filler::Placeholder;
use crate::schema::scene::{Category, LibraryEntry, SceneMeta, SceneTemplate};

/// Number of templates in the corpus.
pub const CORPUS_SIZE: usize = 120;

/// How many corpus entries the library view lists.
pub const LIBRARY_SIZE: usize = 110;

pub static CATEGORIES: [Category; 11] = [
    Category {
        id: "negotiation",
        title: "Переговоры",
        keywords: &["перег", "договор", "deal", "negoti", "диплом", "медиатор"],
    },
    Category {
        id: "investigation",
        title: "Расследование",
        keywords: &["расслед", "улики", "след", "intel", "инфо", "наблю"],
    },
    Category {
        id: "border",
        title: "Граница и давление",
        keywords: &["границ", "border", "heat", "давлен", "провокац", "тег"],
    },
    Category {
        id: "family",
        title: "Семья и прошлое",
        keywords: &["сем", "родн", "прошл", "дет", "дом", "стар"],
    },
    Category {
        id: "community",
        title: "Комьюнити",
        keywords: &["community", "район", "сосед", "ивент", "помощ", "школ"],
    },
    Category {
        id: "code",
        title: "Кодекс и дисциплина",
        keywords: &["код", "правил", "дисцип", "уваж", "respect", "огранич"],
    },
    Category {
        id: "cops",
        title: "Давление системы",
        keywords: &["коп", "police", "lspd", "протокол", "опрос", "штраф"],
    },
    Category {
        id: "money",
        title: "Деньги и фасады",
        keywords: &["день", "касс", "front", "бизнес", "долг", "бумаг"],
    },
    Category {
        id: "loyalty",
        title: "Лояльность",
        keywords: &["лоял", "утеч", "предат", "trust", "провер", "верн"],
    },
    Category {
        id: "mentor",
        title: "Наставничество",
        keywords: &["нович", "учить", "трен", "mentor", "пут", "put-on"],
    },
    Category {
        id: "romance",
        title: "Личная линия",
        keywords: &["роман", "отнош", "люб", "ревн", "секрет", "встреч"],
    },
];

const LOCATIONS: [&str; 20] = [
    "магазин на углу",
    "гараж у блоков",
    "двор у подъезда",
    "кафе в Strawberry",
    "парковка у мотеля",
    "подъезд с граффити",
    "крыша с видом на Davis",
    "прачечная (как нейтральная зона)",
    "автозаправка на границе",
    "общественный центр",
    "склад на окраине",
    "задний двор бара",
    "футбольное поле школы",
    "остановка поздним вечером",
    "мостик через канал",
    "палатка с уличной едой",
    "аллея за аптекой",
    "тихая улица с закрытыми магазинами",
    "комната для собраний в «витрине»",
    "корт, где обычно решают словами",
];

const HOOKS: [&str; 10] = [
    "кто-то назначил встречу и не пришёл",
    "в районе пошёл слух, который звучит слишком точно",
    "появилась чужая метка поверх знакомого цвета",
    "человек из списка «связей» пропал на сутки",
    "на стол легло предложение, от которого пахнет ловушкой",
    "новичок сделал ошибку, и теперь это надо разрулить",
    "кто-то просит «тихий разговор» вместо громкой сцены",
    "пришла бумага/уведомление, которое не должно было прийти",
    "кто-то хочет вернуть долг, но не деньгами",
    "видеозапись всплыла не вовремя",
];

const STAKES: [&str; 10] = [
    "репутация сета",
    "доверие внутри команды",
    "безопасность конкретного человека",
    "контроль Heat на границе",
    "сохранение фасада/витрины",
    "молчание свидетеля",
    "возможность перемирия",
    "долг, который пора закрыть",
    "влияние на районное событие",
    "сохранение лица без эскалации",
];

const TWISTS: [&str; 9] = [
    "в разговор вмешивается третья сторона",
    "оказывается, что у одной детали есть второй смысл",
    "кто-то записывает происходящее",
    "всплывает старое обещание, о котором никто не хотел помнить",
    "приходит неожиданный звонок, меняющий ставки",
    "выясняется, что «утечка» — не утечка, а приманка",
    "на месте появляется человек из прошлого",
    "возникает проверка/наблюдение, из-за которого надо менять тон",
    "кто-то предлагает «компромисс», который режет по морали",
];

const ENDINGS: [&str; 5] = [
    "Ты закрываешь сцену словом или действием?",
    "Кому ты доверишь следующий шаг?",
    "Ты выбираешь мир или принцип — и почему?",
    "Что ты берёшь с собой как трофей: факт, долг или вину?",
    "Где ты поставишь границу прямо сейчас?",
];

const NPCS: [&str; 20] = [
    "Monica",
    "Vince",
    "Lex",
    "Dani",
    "Sofi",
    "Rico",
    "Gabe",
    "Ike",
    "Cami",
    "Mace",
    "старый посредник",
    "соседка, которая всё видит",
    "парень из автомастерской",
    "учитель из школы",
    "юрист по мелким делам",
    "бариста, который слышит разговоры",
    "охранник с «нейтральной» точки",
    "репортёр, ищущий историю",
    "двоюродный брат",
    "бывший напарник",
];

static CORPUS: Lazy<Vec<SceneTemplate>> = Lazy::new(|| build_corpus(CORPUS_SIZE));

/// The process-wide corpus, built on first access.
pub fn corpus() -> &'static [SceneTemplate] {
    &CORPUS
}

/// Look up a category by id.
pub fn category(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

/// Display title for a category id, falling back to the id itself.
pub fn category_title(id: &str) -> &str {
    category(id).map(|c| c.title).unwrap_or(id)
}

/// Look up a template by its `Sxxx` id.
pub fn find(id: &str) -> Option<&'static SceneTemplate> {
    corpus().iter().find(|s| s.id == id)
}

/// Listing rows for the library view.
pub fn library() -> Vec<LibraryEntry> {
    corpus()
        .iter()
        .take(LIBRARY_SIZE)
        .map(|s| LibraryEntry {
            id: s.id.clone(),
            title: s.title.clone(),
            category_title: category_title(&s.category).to_string(),
            location: s.meta.location.clone(),
        })
        .collect()
}

/// Build `count` templates from the fact tables. Pure: the same count
/// always yields the same sequence.
pub fn build_corpus(count: usize) -> Vec<SceneTemplate> {
    (0..count).map(build_template).collect()
}

fn build_template(i: usize) -> SceneTemplate {
    let cat = &CATEGORIES[i % CATEGORIES.len()];
    let location = LOCATIONS[i % LOCATIONS.len()];
    let hook = HOOKS[(i * 3) % HOOKS.len()];
    let stake = STAKES[(i * 5) % STAKES.len()];
    let twist = TWISTS[(i * 7) % TWISTS.len()];
    let ending = ENDINGS[(i * 11) % ENDINGS.len()];
    let npc = NPCS[(i * 13) % NPCS.len()];

    let prompt = [
        format!("Локация: {location}."),
        format!("Завязка: {hook}."),
        format!("Ставки: {stake}."),
        format!("Фокус игрока: {}.", Placeholder::Focus.token()),
        format!(
            "Участники: {}{} ({}, {}) и {npc}.",
            Placeholder::Name.token(),
            Placeholder::Alias.token(),
            Placeholder::Role.token(),
            Placeholder::Set.token(),
        ),
        "Ход сцены:".to_string(),
        "1) Открытие: ты фиксируешь, что именно нужно получить/сохранить.".to_string(),
        "2) Давление: кто-то проверяет твою позицию (словами, паузой, вопросом).".to_string(),
        "3) Выбор: ты предлагаешь ход, который сохраняет лицо, но требует цены.".to_string(),
        format!("4) Поворот: {twist}."),
        format!("5) Финал: {ending}"),
    ]
    .join("\n");

    SceneTemplate {
        id: format!("S{:03}", i + 1),
        category: cat.id.to_string(),
        title: format!("{}: {}", cat.title, capitalize(hook)),
        prompt,
        meta: SceneMeta {
            location: location.to_string(),
            hook: hook.to_string(),
            stake: stake.to_string(),
            twist: twist.to_string(),
            npc: npc.to_string(),
        },
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn corpus_has_fixed_size_and_unique_ids() {
        let scenes = corpus();
        assert_eq!(scenes.len(), CORPUS_SIZE);
        let ids: FxHashSet<&str> = scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), CORPUS_SIZE);
        assert_eq!(scenes[0].id, "S001");
        assert_eq!(scenes[119].id, "S120");
    }

    #[test]
    fn rebuild_is_identical() {
        assert_eq!(build_corpus(CORPUS_SIZE), corpus().to_vec());
    }

    #[test]
    fn facets_follow_index_arithmetic() {
        let s = &corpus()[7];
        assert_eq!(s.category, CATEGORIES[7].id);
        assert_eq!(s.meta.location, LOCATIONS[7]);
        assert_eq!(s.meta.hook, HOOKS[21 % 10]);
        assert_eq!(s.meta.stake, STAKES[35 % 10]);
        assert_eq!(s.meta.twist, TWISTS[49 % 9]);
        assert_eq!(s.meta.npc, NPCS[91 % 20]);
        assert!(s.prompt.ends_with(ENDINGS[77 % 5]));
    }

    #[test]
    fn title_capitalizes_hook() {
        let s = &corpus()[0];
        assert_eq!(s.title, "Переговоры: Кто-то назначил встречу и не пришёл");
    }

    #[test]
    fn every_prompt_carries_all_placeholders() {
        for s in corpus() {
            for p in Placeholder::ALL {
                assert!(s.prompt.contains(p.token()), "{} lacks {}", s.id, p.token());
            }
        }
    }

    #[test]
    fn category_lookup() {
        assert_eq!(category_title("border"), "Граница и давление");
        assert_eq!(category_title("unknown"), "unknown");
        assert!(find("S042").is_some());
        assert!(find("S121").is_none());
    }

    #[test]
    fn library_lists_first_entries() {
        let rows = library();
        assert_eq!(rows.len(), LIBRARY_SIZE);
        assert_eq!(rows[0].id, "S001");
        assert_eq!(rows[0].category_title, "Переговоры");
        assert_eq!(rows[0].location, "магазин на углу");
    }
}
