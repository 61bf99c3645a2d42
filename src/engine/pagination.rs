/// One control of the pager row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageLink {
    Previous { target: usize, enabled: bool },
    Page { number: usize, active: bool },
    Gap,
    Next { target: usize, enabled: bool },
}

// pages shown on each side of the current one
const WINDOW: usize = 2;

/// Builds the pager for `current` out of `total` pages: an arrow on each end,
/// a window of pages around the current one, and the first/last page behind an
/// ellipsis when the window does not reach them.
pub fn page_links(current: usize, total: usize) -> Vec<PageLink> {
    let total = total.max(1);
    let current = current.clamp(1, total);

    let mut links = vec![PageLink::Previous {
        target: current.saturating_sub(1).max(1),
        enabled: current > 1,
    }];

    let start = current.saturating_sub(WINDOW).max(1);
    let end = (current + WINDOW).min(total);

    if start > 1 {
        links.push(PageLink::Page {
            number: 1,
            active: false,
        });
        if start > 2 {
            links.push(PageLink::Gap);
        }
    }

    for number in start..=end {
        links.push(PageLink::Page {
            number,
            active: number == current,
        });
    }

    if end < total {
        if end + 1 < total {
            links.push(PageLink::Gap);
        }
        links.push(PageLink::Page {
            number: total,
            active: false,
        });
    }

    links.push(PageLink::Next {
        target: (current + 1).min(total),
        enabled: current < total,
    });
    links
}
