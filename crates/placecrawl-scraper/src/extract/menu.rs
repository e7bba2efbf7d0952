//! Menu tab. The site serves two layouts: the smart-order list and the
//! classic list. The smart-order layout is tried first.

use placecrawl_core::{MenuItem, StoreRecord};

use super::{skip_item, soft, Extractor};
use crate::dom::{self, find_text};
use crate::error::{PortError, ScraperError};
use crate::port::ElementRef;
use crate::selectors::{
    CLASSIC_MENU, CLASSIC_MENU_INTRO, CLASSIC_MENU_ITEMS, CLASSIC_MENU_NAME, CLASSIC_MENU_PRICE,
    CLASSIC_MENU_REPRESENTATIVE, REPRESENTATIVE_TEXT, SMART_MENU, SMART_MENU_INTRO,
    SMART_MENU_ITEMS, SMART_MENU_NAME, SMART_MENU_PRICE, SMART_MENU_REPRESENTATIVE, TAB_MENU,
};

impl Extractor<'_> {
    pub(super) async fn fill_menu(&self, record: &mut StoreRecord) -> Result<(), ScraperError> {
        let opened = soft("menu tab", false, async {
            dom::open_tab(self.port, TAB_MENU, self.timings).await?;
            Ok::<_, PortError>(true)
        })
        .await?;
        if !opened {
            return Ok(());
        }

        let mut items = soft("smart menu", Vec::new(), self.smart_menu()).await?;
        if items.is_empty() {
            items = soft("classic menu", Vec::new(), self.classic_menu()).await?;
        }
        record.menu_items = items;
        Ok(())
    }

    async fn smart_menu(&self) -> Result<Vec<MenuItem>, PortError> {
        if self.port.find_element(&SMART_MENU, None).await?.is_none() {
            return Ok(Vec::new());
        }
        let mut items = Vec::new();
        for block in self.port.find_elements(&SMART_MENU_ITEMS, None).await? {
            match self.smart_item(&block).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(err) => skip_item("smart menu item", err)?,
            }
        }
        Ok(items)
    }

    /// Smart-order entries are only kept when name, description and price
    /// are all present.
    async fn smart_item(&self, block: &ElementRef) -> Result<Option<MenuItem>, PortError> {
        let is_representative = self
            .port
            .find_element(&SMART_MENU_REPRESENTATIVE, Some(block))
            .await?
            .is_some();
        let (Some(name), Some(intro), Some(price)) = (
            find_text(self.port, &SMART_MENU_NAME, Some(block)).await?,
            find_text(self.port, &SMART_MENU_INTRO, Some(block)).await?,
            find_text(self.port, &SMART_MENU_PRICE, Some(block)).await?,
        ) else {
            return Ok(None);
        };
        Ok(Some(MenuItem {
            name,
            intro: Some(intro.replace("\\/", "/")),
            price: Some(price),
            is_representative,
        }))
    }

    async fn classic_menu(&self) -> Result<Vec<MenuItem>, PortError> {
        let Some(list) = self.port.find_element(&CLASSIC_MENU, None).await? else {
            return Ok(Vec::new());
        };
        let mut items = Vec::new();
        for entry in self.port.find_elements(&CLASSIC_MENU_ITEMS, Some(&list)).await? {
            match self.classic_item(&entry).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(err) => skip_item("classic menu item", err)?,
            }
        }
        Ok(items)
    }

    async fn classic_item(&self, entry: &ElementRef) -> Result<Option<MenuItem>, PortError> {
        let Some(name) = find_text(self.port, &CLASSIC_MENU_NAME, Some(entry)).await? else {
            return Ok(None);
        };
        let is_representative = find_text(self.port, &CLASSIC_MENU_REPRESENTATIVE, Some(entry))
            .await?
            .is_some_and(|tag| tag == REPRESENTATIVE_TEXT);
        let non_empty = |text: Option<String>| text.filter(|t| !t.is_empty());
        let intro = non_empty(find_text(self.port, &CLASSIC_MENU_INTRO, Some(entry)).await?);
        let price = non_empty(find_text(self.port, &CLASSIC_MENU_PRICE, Some(entry)).await?);
        Ok(Some(MenuItem {
            name,
            intro,
            price,
            is_representative,
        }))
    }
}
