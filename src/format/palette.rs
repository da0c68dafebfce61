//! Fixed thread palettes used by formats that store colors as indices.
//!
//! PEC (and therefore PES) refers to the Brother palette, JEF to the Janome
//! palette. Index 0 is reserved in both and is never chosen when encoding.

use crate::pattern::{Rgb, Thread};

/// One palette slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub color: Rgb,
    pub name: &'static str,
    /// Vendor catalog number; empty when the vendor publishes none.
    pub catalog: &'static str,
}

const fn entry(r: u8, g: u8, b: u8, name: &'static str, catalog: &'static str) -> PaletteEntry {
    PaletteEntry {
        color: Rgb::new(r, g, b),
        name,
        catalog,
    }
}

/// An indexed thread palette.
#[derive(Debug)]
pub struct Palette {
    pub name: &'static str,
    entries: &'static [PaletteEntry],
}

impl Palette {
    /// Number of slots, including the reserved index 0.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PaletteEntry> {
        self.entries.get(index)
    }

    /// The thread stored at `index`, with name and catalog number.
    pub fn thread(&self, index: usize) -> Option<Thread> {
        self.get(index).map(|e| {
            let thread = Thread::new(e.color).with_description(e.name);
            if e.catalog.is_empty() {
                thread
            } else {
                thread.with_catalog_number(e.catalog)
            }
        })
    }

    /// Index of the closest color, skipping the reserved slot.
    ///
    /// Ties resolve to the lowest index.
    pub fn nearest(&self, color: Rgb) -> usize {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .min_by_key(|(i, e)| (e.color.distance_sq(&color), *i))
            .map_or(1, |(i, _)| i)
    }
}

/// Brother PEC palette.
pub static PEC: Palette = Palette {
    name: "Brother PEC",
    entries: &PEC_ENTRIES,
};

/// Janome JEF palette.
pub static JANOME: Palette = Palette {
    name: "Janome",
    entries: &JANOME_ENTRIES,
};

static PEC_ENTRIES: [PaletteEntry; 65] = [
    entry(0, 0, 0, "Unknown", ""),
    entry(14, 31, 124, "Prussian Blue", ""),
    entry(10, 85, 163, "Blue", ""),
    entry(48, 135, 119, "Teal Green", ""),
    entry(75, 107, 175, "Cornflower Blue", ""),
    entry(237, 23, 31, "Red", ""),
    entry(209, 92, 0, "Reddish Brown", ""),
    entry(145, 54, 151, "Magenta", ""),
    entry(228, 154, 203, "Light Lilac", ""),
    entry(145, 95, 172, "Lilac", ""),
    entry(157, 214, 125, "Mint Green", ""),
    entry(232, 169, 0, "Deep Gold", ""),
    entry(254, 186, 53, "Orange", ""),
    entry(255, 255, 0, "Yellow", ""),
    entry(112, 188, 31, "Lime Green", ""),
    entry(186, 152, 0, "Brass", ""),
    entry(168, 168, 168, "Silver", ""),
    entry(125, 111, 0, "Russet Brown", ""),
    entry(255, 255, 179, "Cream Brown", ""),
    entry(79, 85, 86, "Pewter", ""),
    entry(0, 0, 0, "Black", ""),
    entry(11, 61, 145, "Ultramarine", ""),
    entry(119, 1, 118, "Royal Purple", ""),
    entry(41, 49, 51, "Dark Gray", ""),
    entry(42, 19, 1, "Dark Brown", ""),
    entry(246, 74, 138, "Deep Rose", ""),
    entry(178, 118, 36, "Light Brown", ""),
    entry(252, 187, 197, "Salmon Pink", ""),
    entry(254, 55, 15, "Vermillion", ""),
    entry(240, 240, 240, "White", ""),
    entry(106, 28, 138, "Violet", ""),
    entry(168, 221, 196, "Seacrest", ""),
    entry(37, 132, 187, "Sky Blue", ""),
    entry(254, 179, 67, "Pumpkin", ""),
    entry(255, 243, 107, "Cream Yellow", ""),
    entry(208, 166, 96, "Khaki", ""),
    entry(209, 84, 0, "Clay Brown", ""),
    entry(102, 186, 73, "Leaf Green", ""),
    entry(19, 74, 70, "Peacock Blue", ""),
    entry(135, 135, 135, "Gray", ""),
    entry(216, 204, 198, "Warm Gray", ""),
    entry(67, 86, 7, "Dark Olive", ""),
    entry(253, 217, 222, "Flesh Pink", ""),
    entry(249, 147, 188, "Pink", ""),
    entry(0, 56, 34, "Deep Green", ""),
    entry(178, 175, 212, "Lavender", ""),
    entry(104, 106, 176, "Wisteria Violet", ""),
    entry(239, 227, 185, "Beige", ""),
    entry(247, 56, 102, "Carmine", ""),
    entry(181, 75, 100, "Amber Red", ""),
    entry(19, 43, 26, "Olive Green", ""),
    entry(199, 1, 86, "Dark Fuschia", ""),
    entry(254, 158, 50, "Tangerine", ""),
    entry(168, 222, 235, "Light Blue", ""),
    entry(0, 103, 62, "Emerald Green", ""),
    entry(78, 41, 144, "Purple", ""),
    entry(47, 126, 32, "Moss Green", ""),
    entry(255, 204, 204, "Flesh Pink", ""),
    entry(255, 217, 17, "Harvest Gold", ""),
    entry(9, 91, 166, "Electric Blue", ""),
    entry(240, 249, 112, "Lemon Yellow", ""),
    entry(227, 243, 91, "Fresh Green", ""),
    entry(255, 153, 0, "Orange", ""),
    entry(255, 240, 141, "Cream Yellow", ""),
    entry(255, 200, 200, "Applique", ""),
];

static JANOME_ENTRIES: [PaletteEntry; 79] = [
    entry(0, 0, 0, "Placeholder", "000"),
    entry(0, 0, 0, "Black", "002"),
    entry(255, 255, 255, "White", "001"),
    entry(255, 255, 23, "Yellow", "204"),
    entry(255, 102, 0, "Orange", "203"),
    entry(47, 89, 51, "Olive Green", "219"),
    entry(35, 115, 54, "Green", "226"),
    entry(101, 194, 200, "Sky", "217"),
    entry(171, 90, 150, "Purple", "208"),
    entry(246, 105, 160, "Pink", "201"),
    entry(255, 0, 0, "Red", "225"),
    entry(177, 112, 78, "Brown", "214"),
    entry(11, 47, 132, "Blue", "207"),
    entry(228, 195, 93, "Gold", "003"),
    entry(72, 26, 5, "Dark Brown", "205"),
    entry(172, 156, 199, "Pale Violet", "209"),
    entry(252, 242, 148, "Pale Yellow", "210"),
    entry(249, 153, 183, "Pale Pink", "211"),
    entry(250, 179, 129, "Peach", "212"),
    entry(201, 164, 128, "Beige", "213"),
    entry(151, 5, 51, "Wine Red", "215"),
    entry(160, 184, 204, "Pale Sky", "216"),
    entry(127, 194, 28, "Yellow Green", "218"),
    entry(229, 229, 229, "Silver Gray", "220"),
    entry(136, 155, 155, "Gray", "221"),
    entry(152, 214, 189, "Pale Aqua", "227"),
    entry(178, 225, 227, "Baby Blue", "228"),
    entry(54, 139, 160, "Powder Blue", "229"),
    entry(79, 131, 171, "Bright Blue", "230"),
    entry(56, 106, 145, "Slate Blue", "231"),
    entry(7, 22, 80, "Navy Blue", "232"),
    entry(249, 153, 162, "Salmon Pink", "233"),
    entry(249, 103, 107, "Coral", "234"),
    entry(227, 49, 31, "Burnt Orange", "235"),
    entry(226, 161, 136, "Cinnamon", "236"),
    entry(181, 148, 116, "Umber", "237"),
    entry(228, 207, 153, "Blond", "238"),
    entry(255, 203, 0, "Sunflower", "239"),
    entry(225, 173, 212, "Orchid Pink", "240"),
    entry(195, 0, 126, "Peony Purple", "241"),
    entry(128, 0, 75, "Burgundy", "242"),
    entry(84, 5, 113, "Royal Purple", "243"),
    entry(177, 5, 37, "Cardinal Red", "244"),
    entry(202, 224, 192, "Opal Green", "245"),
    entry(137, 152, 86, "Moss Green", "246"),
    entry(92, 148, 26, "Meadow Green", "247"),
    entry(0, 49, 20, "Dark Green", "248"),
    entry(93, 174, 148, "Aquamarine", "249"),
    entry(76, 191, 143, "Emerald Green", "250"),
    entry(0, 119, 114, "Peacock Green", "251"),
    entry(89, 91, 97, "Dark Gray", "252"),
    entry(255, 255, 242, "Ivory White", "253"),
    entry(177, 88, 24, "Hazel", "254"),
    entry(203, 138, 7, "Toast", "255"),
    entry(152, 108, 128, "Salmon", "256"),
    entry(152, 105, 45, "Cocoa Brown", "257"),
    entry(77, 52, 25, "Sienna", "258"),
    entry(76, 51, 11, "Sepia", "259"),
    entry(51, 32, 10, "Dark Sepia", "260"),
    entry(82, 58, 151, "Violet Blue", "261"),
    entry(13, 33, 126, "Blue Ink", "262"),
    entry(30, 119, 172, "Sola Blue", "263"),
    entry(178, 221, 83, "Green Dust", "264"),
    entry(243, 54, 137, "Crimson", "265"),
    entry(222, 100, 158, "Floral Pink", "266"),
    entry(152, 65, 97, "Wine", "267"),
    entry(76, 86, 18, "Olive Drab", "268"),
    entry(76, 136, 31, "Meadow", "269"),
    entry(228, 222, 121, "Mustard", "270"),
    entry(203, 138, 26, "Yellow Ochre", "271"),
    entry(198, 170, 66, "Old Gold", "272"),
    entry(236, 176, 44, "Honeydew", "273"),
    entry(248, 128, 64, "Tangerine", "274"),
    entry(255, 229, 5, "Canary Yellow", "275"),
    entry(250, 122, 122, "Vermillion", "202"),
    entry(107, 224, 0, "Bright Green", "206"),
    entry(56, 108, 174, "Ocean Blue", "222"),
    entry(227, 196, 180, "Beige Gray", "223"),
    entry(227, 172, 129, "Bamboo", "224"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_sizes() {
        assert_eq!(PEC.len(), 65);
        assert_eq!(JANOME.len(), 79);
    }

    #[test]
    fn test_exact_colors_map_to_their_slot() {
        assert_eq!(PEC.nearest(Rgb::new(237, 23, 31)), 5);
        assert_eq!(PEC.nearest(Rgb::new(255, 200, 200)), 64);
        assert_eq!(JANOME.nearest(Rgb::new(255, 255, 23)), 3);
    }

    #[test]
    fn test_reserved_slot_is_skipped() {
        // Black is both slot 0 and slot 20 in PEC.
        assert_eq!(PEC.nearest(Rgb::BLACK), 20);
        assert_eq!(JANOME.nearest(Rgb::BLACK), 1);
    }

    #[test]
    fn test_nearest_approximates() {
        assert_eq!(JANOME.nearest(Rgb::new(250, 2, 3)), 10);
        assert_eq!(PEC.nearest(Rgb::new(250, 250, 250)), 29);
    }

    #[test]
    fn test_thread_carries_catalog() {
        let t = JANOME.thread(2).unwrap();
        assert_eq!(t.description.as_deref(), Some("White"));
        assert_eq!(t.catalog_number.as_deref(), Some("001"));

        let t = PEC.thread(1).unwrap();
        assert_eq!(t.color, Rgb::new(14, 31, 124));
        assert_eq!(t.catalog_number, None);
        assert!(PEC.thread(65).is_none());
    }
}
