//! Minimal XML tree walking for DAV multistatus responses

use minidom::Element;

/// Walks an XML tree and returns every element with the given (local) name
pub fn find_elems<'a>(root: &'a Element, searched_name: &str) -> Vec<&'a Element> {
    let mut elems: Vec<&Element> = Vec::new();

    for el in root.children() {
        if el.name() == searched_name {
            elems.push(el);
        } else {
            elems.extend(find_elems(el, searched_name));
        }
    }
    elems
}

/// Walks an XML tree until it finds an element with the given (local) name
pub fn find_elem<'a>(root: &'a Element, searched_name: &str) -> Option<&'a Element> {
    if root.name() == searched_name {
        return Some(root);
    }

    for el in root.children() {
        if el.name() == searched_name {
            return Some(el);
        }
        if let Some(found) = find_elem(el, searched_name) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    const MULTISTATUS: &str = r#"<d:multistatus xmlns:d="DAV:">
        <d:response>
            <d:href>/calendars/user/events/first.ics</d:href>
            <d:status>HTTP/1.1 200 OK</d:status>
        </d:response>
        <d:response>
            <d:href>/calendars/user/events/second.ics</d:href>
            <d:status>HTTP/1.1 404 Not Found</d:status>
        </d:response>
    </d:multistatus>"#;

    #[test]
    fn test_find_elems() {
        let root: Element = MULTISTATUS.parse().unwrap();
        assert_eq!(find_elems(&root, "response").len(), 2);
        assert_eq!(find_elems(&root, "propstat").len(), 0);
    }

    #[test]
    fn test_find_elem() {
        let root: Element = MULTISTATUS.parse().unwrap();
        let href = find_elem(&root, "href").unwrap();
        assert_eq!(href.text(), "/calendars/user/events/first.ics");
        assert!(find_elem(&root, "getetag").is_none());
    }
}
