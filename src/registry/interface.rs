//! Menus, toolbar, sidebar and other interface hooks.

use super::container::PriorityRegistry;
use super::UnlocalizedString;
use std::fmt;
use std::sync::Arc;

/// Path element that draws a separator instead of an item
pub const SEPARATOR: &str = "$SEPARATOR$";

/// Path element that marks the item as a sub-menu drawn by its callback
pub const SUB_MENU: &str = "$SUBMENU$";

pub type Callback = Arc<dyn Fn() + Send + Sync>;
pub type EnabledCallback = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Super,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ctrl => "CTRL",
            Self::Alt => "ALT",
            Self::Shift => "SHIFT",
            Self::Super => "SUPER",
        };
        f.write_str(name)
    }
}

/// A key combination such as `CTRL + SHIFT + S`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub modifiers: Vec<Modifier>,
    pub key: String,
}

impl Shortcut {
    pub fn new(modifiers: &[Modifier], key: impl Into<String>) -> Self {
        let mut modifiers = modifiers.to_vec();
        modifiers.sort_by_key(|modifier| *modifier as u8);
        modifiers.dedup();

        Self {
            modifiers,
            key: key.into().to_uppercase(),
        }
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{modifier} + ")?;
        }
        f.write_str(&self.key)
    }
}

/// Top-level menu such as "File"
#[derive(Debug, Clone)]
pub struct MainMenuItem {
    pub unlocalized_name: UnlocalizedString,
}

pub struct MenuItem {
    /// Main menu name first, then nested labels down to the item itself
    pub path: Vec<UnlocalizedString>,
    pub shortcut: Option<Shortcut>,
    pub callback: Callback,
    pub enabled: EnabledCallback,
}

impl MenuItem {
    #[must_use]
    pub fn is_separator(&self) -> bool {
        self.path.last().is_some_and(|name| *name == SEPARATOR)
    }

    #[must_use]
    pub fn is_sub_menu(&self) -> bool {
        self.path.last().is_some_and(|name| *name == SUB_MENU)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        (self.enabled)()
    }

    /// Run the item's action if it is enabled. Returns whether it ran.
    pub fn activate(&self) -> bool {
        if self.is_separator() || !self.is_enabled() {
            return false;
        }

        (self.callback)();
        true
    }
}

pub struct ToolbarItem {
    pub callback: Callback,
}

pub struct SidebarItem {
    pub icon: String,
    pub callback: Callback,
    pub enabled: EnabledCallback,
}

pub struct TitleBarButton {
    pub icon: String,
    pub unlocalized_tooltip: UnlocalizedString,
    pub callback: Callback,
}

#[derive(Default)]
pub struct Interface {
    main_menu_items: PriorityRegistry<MainMenuItem>,
    menu_items: PriorityRegistry<MenuItem>,
    welcome_screen_entries: Vec<Callback>,
    footer_items: Vec<Callback>,
    toolbar_items: Vec<ToolbarItem>,
    sidebar_items: Vec<SidebarItem>,
    title_bar_buttons: Vec<TitleBarButton>,
}

impl Interface {
    pub fn register_main_menu_item(&mut self, unlocalized_name: impl Into<UnlocalizedString>, priority: u32) {
        self.main_menu_items.add(
            priority,
            MainMenuItem {
                unlocalized_name: unlocalized_name.into(),
            },
        );
    }

    pub fn add_menu_item<S: Into<UnlocalizedString>>(
        &mut self,
        path: impl IntoIterator<Item = S>,
        priority: u32,
        shortcut: Option<Shortcut>,
        callback: impl Fn() + Send + Sync + 'static,
        enabled: impl Fn() -> bool + Send + Sync + 'static,
    ) {
        self.menu_items.add(
            priority,
            MenuItem {
                path: path.into_iter().map(Into::into).collect(),
                shortcut,
                callback: Arc::new(callback),
                enabled: Arc::new(enabled),
            },
        );
    }

    /// Add a sub-menu under `path`, drawn by `callback`
    pub fn add_menu_item_sub_menu<S: Into<UnlocalizedString>>(
        &mut self,
        path: impl IntoIterator<Item = S>,
        priority: u32,
        callback: impl Fn() + Send + Sync + 'static,
        enabled: impl Fn() -> bool + Send + Sync + 'static,
    ) {
        let mut path: Vec<UnlocalizedString> = path.into_iter().map(Into::into).collect();
        path.push(SUB_MENU.into());
        self.add_menu_item(path, priority, None, callback, enabled);
    }

    /// Add a separator to the menu `path`
    pub fn add_menu_item_separator<S: Into<UnlocalizedString>>(
        &mut self,
        path: impl IntoIterator<Item = S>,
        priority: u32,
    ) {
        let mut path: Vec<UnlocalizedString> = path.into_iter().map(Into::into).collect();
        path.push(SEPARATOR.into());
        self.add_menu_item(path, priority, None, || {}, || false);
    }

    pub fn add_welcome_screen_entry(&mut self, callback: impl Fn() + Send + Sync + 'static) {
        self.welcome_screen_entries.push(Arc::new(callback));
    }

    pub fn add_footer_item(&mut self, callback: impl Fn() + Send + Sync + 'static) {
        self.footer_items.push(Arc::new(callback));
    }

    pub fn add_toolbar_item(&mut self, callback: impl Fn() + Send + Sync + 'static) {
        self.toolbar_items.push(ToolbarItem {
            callback: Arc::new(callback),
        });
    }

    pub fn add_sidebar_item(
        &mut self,
        icon: impl Into<String>,
        callback: impl Fn() + Send + Sync + 'static,
        enabled: impl Fn() -> bool + Send + Sync + 'static,
    ) {
        self.sidebar_items.push(SidebarItem {
            icon: icon.into(),
            callback: Arc::new(callback),
            enabled: Arc::new(enabled),
        });
    }

    pub fn add_title_bar_button(
        &mut self,
        icon: impl Into<String>,
        unlocalized_tooltip: impl Into<UnlocalizedString>,
        callback: impl Fn() + Send + Sync + 'static,
    ) {
        self.title_bar_buttons.push(TitleBarButton {
            icon: icon.into(),
            unlocalized_tooltip: unlocalized_tooltip.into(),
            callback: Arc::new(callback),
        });
    }

    pub fn main_menu_items(&self) -> impl Iterator<Item = &MainMenuItem> {
        self.main_menu_items.values()
    }

    pub fn menu_items(&self) -> impl Iterator<Item = (u32, &MenuItem)> {
        self.menu_items.iter()
    }

    /// Items whose path starts with `prefix`, in priority order
    pub fn menu_items_under<'a>(&'a self, prefix: &'a [&'a str]) -> impl Iterator<Item = &'a MenuItem> + 'a {
        self.menu_items.values().filter(move |item| {
            item.path.len() > prefix.len()
                && item.path.iter().zip(prefix).all(|(name, wanted)| name == wanted)
        })
    }

    /// First menu item bound to `shortcut`
    #[must_use]
    pub fn find_by_shortcut(&self, shortcut: &Shortcut) -> Option<&MenuItem> {
        self.menu_items
            .values()
            .find(|item| item.shortcut.as_ref() == Some(shortcut))
    }

    pub fn welcome_screen_entries(&self) -> &[Callback] {
        &self.welcome_screen_entries
    }

    pub fn footer_items(&self) -> &[Callback] {
        &self.footer_items
    }

    pub fn toolbar_items(&self) -> &[ToolbarItem] {
        &self.toolbar_items
    }

    pub fn sidebar_items(&self) -> &[SidebarItem] {
        &self.sidebar_items
    }

    pub fn title_bar_buttons(&self) -> &[TitleBarButton] {
        &self.title_bar_buttons
    }

    pub fn clear(&mut self) {
        self.main_menu_items.clear();
        self.menu_items.clear();
        self.welcome_screen_entries.clear();
        self.footer_items.clear();
        self.toolbar_items.clear();
        self.sidebar_items.clear();
        self.title_bar_buttons.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_main_menu_order() {
        let mut interface = Interface::default();
        interface.register_main_menu_item("menu.edit", 2000);
        interface.register_main_menu_item("menu.file", 1000);
        interface.register_main_menu_item("menu.help", 9000);

        let names: Vec<_> = interface
            .main_menu_items()
            .map(|item| item.unlocalized_name.as_str())
            .collect();
        assert_eq!(names, vec!["menu.file", "menu.edit", "menu.help"]);
    }

    #[test]
    fn test_menu_items_under_path() {
        let mut interface = Interface::default();
        interface.add_menu_item(["menu.file", "menu.file.open"], 1100, None, || {}, || true);
        interface.add_menu_item_separator(["menu.file"], 1200);
        interface.add_menu_item(["menu.file", "menu.file.close"], 1300, None, || {}, || true);
        interface.add_menu_item(["menu.edit", "menu.edit.undo"], 1000, None, || {}, || true);

        let file: Vec<_> = interface.menu_items_under(&["menu.file"]).collect();
        assert_eq!(file.len(), 3);
        assert!(file[1].is_separator());
        assert!(!file[1].activate());
        assert_eq!(file[2].path[1], "menu.file.close");
    }

    #[test]
    fn test_shortcut_lookup_and_activation() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut interface = Interface::default();

        let counter = runs.clone();
        interface.add_menu_item(
            ["menu.file", "menu.file.save"],
            1000,
            Some(Shortcut::new(&[Modifier::Shift, Modifier::Ctrl], "s")),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            || true,
        );
        interface.add_menu_item_sub_menu(["menu.file", "menu.file.recent"], 1100, || {}, || false);

        let shortcut = Shortcut::new(&[Modifier::Ctrl, Modifier::Shift], "S");
        assert_eq!(shortcut.to_string(), "CTRL + SHIFT + S");

        let item = interface.find_by_shortcut(&shortcut).unwrap();
        assert!(item.activate());
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let recent = interface.menu_items_under(&["menu.file"]).nth(1).unwrap();
        assert!(recent.is_sub_menu());
        assert!(!recent.activate());
    }
}
