//! Structural assumptions about the map site's markup.
//!
//! Class names on the site are generated and change without notice; keep
//! every one of them here so a layout change is a one-file fix.

use crate::port::Locator;

pub const HOME_URL: &str = "https://map.naver.com/";
pub const SEARCH_URL_PREFIX: &str = "https://map.naver.com/p/search/";

pub const ROOT: Locator = Locator::css("#root");
pub const ENTRY_IFRAME: Locator = Locator::css("iframe#entryIframe");
pub const SEARCH_IFRAME: Locator = Locator::css("iframe#searchIframe");

pub const NO_RESULT_MARKER: Locator = Locator::css(".FYvSc");
pub const NO_RESULT_TEXT: &str = "조건에 맞는 업체가 없습니다";

// Candidate list (inside the search frame).
pub const LIST_CONTAINER: Locator = Locator::css("#_pcmap_list_scroll_container");
pub const CANDIDATE_ROWS: Locator = Locator::css("#_pcmap_list_scroll_container > ul > li");
pub const CANDIDATE_NAME: Locator = Locator::css("div.ouxiq span.YwYLL");
pub const CANDIDATE_ADDRESS: Locator = Locator::css("div.ouxiq span.Pb4bU");

/// Pagination link showing page number `page`.
#[must_use]
pub fn page_link(page: usize) -> Locator {
    Locator::xpath_owned(format!(
        "//a[contains(@class, 'mBN2s') and normalize-space(text())='{page}']"
    ))
}

/// Pagination link for `page` once it is the active page.
#[must_use]
pub fn active_page_link(page: usize) -> Locator {
    Locator::xpath_owned(format!(
        "//a[contains(@class, 'mBN2s') and contains(@class, 'qxokY') and normalize-space(text())='{page}']"
    ))
}

/// Detail view tab by its visible label.
#[must_use]
pub fn tab(label: &str) -> Locator {
    Locator::xpath_owned(format!(
        "//a[@role='tab' and .//span[text()='{label}']]"
    ))
}

pub const TAB_HOME: &str = "홈";
pub const TAB_MENU: &str = "메뉴";
pub const TAB_REVIEW: &str = "리뷰";

// Detail view (inside the entry frame).
pub const TITLE_SPANS: Locator = Locator::css("#_title > div > span");
pub const NEW_LISTING_TEXT: &str = "새로오픈";
pub const NEW_LISTING_CLASS: &str = "PI7f0";
pub const SOCIAL_LINK: Locator = Locator::xpath("//a[contains(@href, 'instagram.com')]");
pub const ADDRESS: Locator =
    Locator::xpath("//strong[contains(., '주소')]/following-sibling::div/a/span");
pub const PHONE: Locator =
    Locator::xpath("//strong[contains(., '전화번호')]/following-sibling::div/span");
pub const MICHELIN_BADGE: Locator =
    Locator::xpath("//div[a[contains(text(), '미쉐린 가이드 서울')]]");
pub const TV_BADGE: Locator = Locator::xpath("//strong[descendant::span[text()='TV방송정보']]");
pub const CONVENIENCES: Locator =
    Locator::xpath("//strong[descendant::span[text()='편의']]/ancestor::div[1]/div/div");
pub const PARKING_WORDS: [&str; 2] = ["주차", "발렛파킹"];
pub const TRANSIT_DISTANCE: Locator =
    Locator::xpath("/html/body/div[3]/div/div/div/div[5]/div/div[2]/div[1]/div/div[1]/div/div");

// Datalab widgets on the home tab.
pub const THEME_CONTAINER: Locator = Locator::css("div.WXrhH");
pub const THEME_ROWS: Locator = Locator::css("ul.v4tIa > li");
pub const THEME_CATEGORY: Locator = Locator::css(".pNnVF");
pub const THEME_KEYWORDS: Locator = Locator::css("span.sJgQj > span");
pub const THEME_EXPAND: Locator =
    Locator::xpath("//div[contains(@class, 'NSTUp')]//span[contains(text(), '더보기')]");
pub const THEME_MOOD: &str = "분위기";
pub const THEME_TOPIC: &str = "인기토픽";
pub const THEME_PURPOSE: &str = "찾는목적";
pub const AGE_CHART: Locator = Locator::css("div.gZ4G4");
pub const AGE_BARS: Locator = Locator::css("#bar_chart_container > ul.Pu5eW > li.JkrLe");
pub const AGE_BAR_VALUE: Locator = Locator::css("span.NwNob");

pub const VISITOR_REVIEWS: Locator = Locator::xpath("//a[contains(text(), '방문자 리뷰')]");
pub const BLOG_REVIEWS: Locator = Locator::xpath("//a[contains(text(), '블로그 리뷰')]");

// Menu tab, two layouts.
pub const SMART_MENU: Locator =
    Locator::css("div.order_list_wrap.order_list_category.store_delivery");
pub const SMART_MENU_ITEMS: Locator = Locator::css("div.info_detail");
pub const SMART_MENU_REPRESENTATIVE: Locator = Locator::css("span.menu_tag.default");
pub const SMART_MENU_NAME: Locator = Locator::css("div.tit");
pub const SMART_MENU_INTRO: Locator = Locator::css("span.detail_txt");
pub const SMART_MENU_PRICE: Locator = Locator::css("div.price");
pub const CLASSIC_MENU: Locator = Locator::css("div.place_section_content > ul");
pub const CLASSIC_MENU_ITEMS: Locator = Locator::css("li.E2jtL");
pub const CLASSIC_MENU_REPRESENTATIVE: Locator = Locator::css("span.QM_zp > span.place_blind");
pub const CLASSIC_MENU_NAME: Locator = Locator::css("span.lPzHi");
pub const CLASSIC_MENU_INTRO: Locator = Locator::css("div.kPogF");
pub const CLASSIC_MENU_PRICE: Locator = Locator::css("div.GXS1X");
pub const REPRESENTATIVE_TEXT: &str = "대표";

// Review tab.
pub const REVIEW_ITEMS: Locator = Locator::xpath("//li[contains(@class, 'place_apply_pui')]");
pub const REVIEW_SORT_LATEST: Locator = Locator::css("div.mlywZ > span.v6aH1:nth-child(2) > a");
pub const REVIEW_KEYWORDS: Locator = Locator::css("li.MHaAm");
pub const REVIEW_KEYWORD_LABEL: Locator = Locator::css("span.t3JSf");
pub const REVIEW_KEYWORD_VOTES: Locator = Locator::css("span.CUoLy");
pub const REVIEW_KEYWORD_VOTES_NOISE: &str = "이 키워드를 선택한 인원";
pub const REVIEW_VISIT_DATE: Locator =
    Locator::xpath(".//span[contains(text(), '방문일')]/following-sibling::span");
pub const REVIEW_COMMENT_PARTS: Locator =
    Locator::xpath(".//div[contains(@class, 'pui__vn15t2')]//a");
pub const REVIEW_MORE_TEXT: &str = "더보기";

// Social profile embed page.
pub const SOCIAL_EMBED_NAME: Locator =
    Locator::xpath("/html/body/div/div/div/div/div/div/div/div/div[1]/div[2]/div[1]/a/div");
pub const SOCIAL_EMBED_FOLLOWERS: Locator = Locator::xpath(
    "/html/body/div/div/div/div/div/div/div/div/div[1]/div[2]/div[3]/span/div[1]/span/span",
);
pub const SOCIAL_EMBED_POSTS: Locator = Locator::xpath(
    "/html/body/div/div/div/div/div/div/div/div/div[1]/div[2]/div[3]/span/div[2]/span/span",
);

pub mod scripts {
    pub const CLICK: &str = "arguments[0].click();";
    pub const SCROLL_INTO_VIEW: &str = "arguments[0].scrollIntoView(true);";
    pub const TEXT_CONTENT: &str = "return arguments[0].textContent;";
    pub const ELEMENT_SCROLL_HEIGHT: &str = "return arguments[0].scrollHeight;";
    pub const SCROLL_PAGE_TO_BOTTOM: &str =
        "window.scrollTo(0, document.body.scrollHeight); return document.body.scrollHeight;";
    pub const PLACE_COORDINATE: &str = r"
        const state = window.__APOLLO_STATE__;
        if (!state) { return null; }
        for (const [key, value] of Object.entries(state)) {
            if (key.startsWith('PlaceDetailBase') && value && value.coordinate) {
                return value.coordinate;
            }
        }
        return null;
    ";
    pub const GENDER_MALE: &str = r"
        const el = document.querySelector('#_datalab_chart_donut1_0')
            ?.querySelector('g.c3-target-male text');
        return el ? el.textContent.trim() : null;
    ";
    pub const GENDER_FEMALE: &str = r"
        const el = document.querySelector('#_datalab_chart_donut1_0')
            ?.querySelector('g.c3-target-female text');
        return el ? el.textContent.trim() : null;
    ";
}
