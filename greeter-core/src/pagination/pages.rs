// File: src/pagination/pages.rs

use greeter_common::models::{Page, SelectOption, TrackCategory, TrackLink};

use super::window::TRACKS_PER_PAGE;

pub const COLOR_SUCCESS: u32 = 0x2ECC71;
pub const COLOR_INFO: u32 = 0x3498DB;
pub const COLOR_ERROR: u32 = 0x992D22;

fn footer(index: usize, count: usize) -> String {
    format!("Page {} of {}", index + 1, count)
}

/// Signed links of one member's tracks, four per page.
pub fn track_listing_pages(owner_name: &str, category: TrackCategory, links: &[TrackLink]) -> Vec<Page> {
    let count = links.len().div_ceil(TRACKS_PER_PAGE).max(1);
    if links.is_empty() {
        return vec![no_tracks_page(owner_name, category)];
    }
    links
        .chunks(TRACKS_PER_PAGE)
        .enumerate()
        .map(|(index, chunk)| {
            chunk
                .iter()
                .enumerate()
                .fold(
                    Page::new(format!("{owner_name}'s {category} voicelines"), COLOR_INFO),
                    |page, (i, link)| {
                        let number = index * TRACKS_PER_PAGE + i + 1;
                        page.field(format!("Voiceline {number}"), format!("[{}]({})", link.track_name, link.signed_url))
                    },
                )
                .footer(footer(index, count))
        })
        .collect()
}

/// Result of an upload: one link per stored track.
pub fn upload_result_pages(owner_name: &str, uploader_name: &str, category: TrackCategory, urls: &[String]) -> Vec<Page> {
    let count = urls.len().div_ceil(TRACKS_PER_PAGE).max(1);
    if urls.is_empty() {
        return vec![Page::new("Nothing uploaded", COLOR_ERROR).description("The upload contained no playable tracks.")];
    }
    urls.chunks(TRACKS_PER_PAGE)
        .enumerate()
        .map(|(index, chunk)| {
            chunk
                .iter()
                .enumerate()
                .fold(
                    Page::new(format!("Uploaded {category} for {owner_name}"), COLOR_SUCCESS)
                        .description(format!("Added by {uploader_name}")),
                    |page, (i, url)| {
                        let number = index * TRACKS_PER_PAGE + i + 1;
                        page.field(format!("Voiceline {number}"), format!("[listen]({url})"))
                    },
                )
                .footer(footer(index, count))
        })
        .collect()
}

/// Pages of a delete menu. Page `i` lists exactly the options the select window shows on it.
pub fn delete_menu_pages(owner_name: &str, category: TrackCategory, options: &[SelectOption]) -> Vec<Page> {
    let count = options.len().div_ceil(TRACKS_PER_PAGE).max(1);
    if options.is_empty() {
        return vec![no_tracks_page(owner_name, category)];
    }
    options
        .chunks(TRACKS_PER_PAGE)
        .enumerate()
        .map(|(index, chunk)| {
            chunk
                .iter()
                .fold(
                    Page::new(format!("Delete {owner_name}'s {category} voicelines"), COLOR_ERROR)
                        .description("Pick the voicelines to delete from the menu below."),
                    |page, option| page.field(option.label.clone(), option.value.clone()),
                )
                .footer(footer(index, count))
        })
        .collect()
}

/// Select options for a delete menu, labelled in stored order.
pub fn delete_menu_options(owner_name: &str, track_names: &[String]) -> Vec<SelectOption> {
    track_names
        .iter()
        .enumerate()
        .map(|(i, name)| SelectOption {
            label: format!("{owner_name}'s Voiceline {}", i + 1),
            value: name.clone(),
        })
        .collect()
}

pub fn no_tracks_page(owner_name: &str, category: TrackCategory) -> Page {
    Page::new("No voicelines", COLOR_INFO).description(format!("{owner_name} has no {category} voicelines yet."))
}

pub fn delete_confirmation_page(deleted: usize, owner_name: &str, deleter_name: &str) -> Page {
    Page::new("Voicelines deleted", COLOR_SUCCESS)
        .description(format!("{deleter_name} deleted {deleted} voiceline(s) of {owner_name}."))
}

pub fn unsupported_upload_page() -> Page {
    Page::new("Invalid usage", COLOR_ERROR).description("File must be an mp3, m4a or zip file!")
}

pub fn unexpected_error_page() -> Page {
    Page::new("Something went wrong", COLOR_ERROR).description("An unexpected error occurred. Please try again later.")
}

pub fn no_longer_available_page() -> Page {
    Page::new("No longer available", COLOR_INFO).description("This menu has expired. Run the command again.")
}

/// Command reference shown by `/help`.
pub fn help_page() -> Page {
    Page::new("Greeter commands", COLOR_INFO)
        .description("Members hear their own voicelines when they join or leave a voice channel.")
        .field("/upload member type file", "Upload mp3, m4a or zip voicelines for a member")
        .field("/voicelines member type", "View the voicelines of a member")
        .field("/delete member type", "Delete voicelines for a member")
        .field("/blacklist", "Stop playing your intros and outros")
        .field("/whitelist", "Remove yourself from the blacklist")
        .field("/help", "Show this menu")
}

pub fn blacklist_page(added: bool) -> Page {
    if added {
        Page::new("Blacklisted", COLOR_SUCCESS).description("Your intros and outros will no longer play.")
    } else {
        Page::new("Already blacklisted", COLOR_INFO).description("You are already on the blacklist.")
    }
}

pub fn whitelist_page(removed: bool) -> Page {
    if removed {
        Page::new("Whitelisted", COLOR_SUCCESS).description("Your intros and outros will play again.")
    } else {
        Page::new("Not blacklisted", COLOR_INFO).description("You are not on the blacklist.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(n: usize) -> Vec<TrackLink> {
        (0..n)
            .map(|i| TrackLink {
                track_name: format!("t{i}"),
                signed_url: format!("https://cdn/voicelines/t{i}"),
            })
            .collect()
    }

    #[test]
    fn listing_splits_four_per_page() {
        let pages = track_listing_pages("ana", TrackCategory::Intro, &links(9));
        assert_eq!(pages.len(), 3);
        assert_eq!(
            pages.iter().map(Page::item_count).collect::<Vec<_>>(),
            vec![4, 4, 1]
        );
        assert_eq!(pages[2].fields[0].name, "Voiceline 9");
        assert_eq!(pages[1].footer.as_deref(), Some("Page 2 of 3"));
    }

    #[test]
    fn help_lists_every_command() {
        let page = help_page();
        assert_eq!(page.color, COLOR_INFO);
        let names: Vec<&str> = page.fields.iter().map(|f| f.name.as_str()).collect();
        for command in ["/upload", "/voicelines", "/delete", "/blacklist", "/whitelist", "/help"] {
            assert!(names.iter().any(|n| n.starts_with(command)), "{command} missing");
        }
    }

    #[test]
    fn empty_listing_is_one_page() {
        let pages = track_listing_pages("ana", TrackCategory::Outro, &[]);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].item_count(), 0);
    }

    #[test]
    fn delete_pages_mirror_options() {
        let names: Vec<String> = (0..6).map(|i| format!("t{i}")).collect();
        let options = delete_menu_options("ana", &names);
        let pages = delete_menu_pages("ana", TrackCategory::Intro, &options);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].item_count(), 2);
        assert_eq!(pages[1].fields[0].name, "ana's Voiceline 5");
        assert_eq!(pages[1].fields[0].value, "t4");
    }
}
