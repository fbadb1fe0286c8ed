//! DOM bindings for page scripts.
//!
//! The document lives on the JS side while scripts run. The host seeds it with
//! `__pv_load` from a node snapshot and reads it back with `__pv_export`; both
//! use the JSON shape of `rv_dom::NodeSnapshot`. Markup parsing inside the
//! context (`innerHTML`, `document.write`, ...) calls back into the Rust parser
//! through `__pv_parse_fragment`.
//!
//! Helper markers are carried as the non-enumerable, read-only `__pvMarker`
//! property. They never surface as attributes.

pub(crate) const DOM_SHIM: &str = r##"
(function () {
  var ELEMENT_NODE = 1;
  var TEXT_NODE = 3;
  var COMMENT_NODE = 8;
  var DOCUMENT_NODE = 9;
  var DOCUMENT_TYPE_NODE = 10;
  var DOCUMENT_FRAGMENT_NODE = 11;

  var VOID_ELEMENTS = {
    area: true, base: true, br: true, col: true, embed: true, hr: true, img: true,
    input: true, link: true, meta: true, param: true, source: true, track: true, wbr: true
  };
  var RAW_TEXT_ELEMENTS = {
    script: true, style: true, xmp: true, iframe: true, noembed: true, noframes: true, plaintext: true
  };
  // Inline handlers for these live on <body> but fire on window.
  var BODY_FORWARDED_EVENTS = {
    load: true, unload: true, beforeunload: true, resize: true, hashchange: true,
    popstate: true, pageshow: true, pagehide: true, message: true
  };

  var state = {
    version: 0,
    registrations: [],
    pending: [],
    scriptCounter: 0,
    writeCursor: null,
    cookies: Object.create(null)
  };
  var documentNode = null;

  String(globalThis.__pv_cookie_seed || "").split(";").forEach(function (part) {
    var pair = part.trim();
    var eq = pair.indexOf("=");
    if (eq > 0) {
      state.cookies[pair.slice(0, eq).trim()] = pair.slice(eq + 1).trim();
    }
  });

  globalThis.__pv_navigations = [];
  function requestNavigation(kind, url) {
    globalThis.__pv_navigations.push({ kind: kind, url: String(url == null ? "" : url) });
  }

  // ---- events -------------------------------------------------------------

  function listenerMap(target, create) {
    if (Object.prototype.hasOwnProperty.call(target, "__pvListeners")) {
      return target.__pvListeners;
    }
    if (!create) {
      return null;
    }
    var map = Object.create(null);
    Object.defineProperty(target, "__pvListeners", { value: map, enumerable: false });
    return map;
  }

  function captureFlag(options) {
    return typeof options === "boolean" ? options : !!(options && options.capture);
  }

  function addListener(target, type, listener, options) {
    if (typeof listener !== "function" && !(listener && typeof listener.handleEvent === "function")) {
      return;
    }
    var capture = captureFlag(options);
    var once = !!(options && typeof options === "object" && options.once);
    var map = listenerMap(target, true);
    var key = String(type);
    var list = map[key] || (map[key] = []);
    for (var i = 0; i < list.length; i += 1) {
      if (list[i].listener === listener && list[i].capture === capture) {
        return;
      }
    }
    list.push({ listener: listener, capture: capture, once: once, removed: false });
  }

  function removeListener(target, type, listener, options) {
    var capture = captureFlag(options);
    var map = listenerMap(target, false);
    var list = map ? map[String(type)] : null;
    if (!list) {
      return;
    }
    for (var i = 0; i < list.length; i += 1) {
      if (list[i].listener === listener && list[i].capture === capture) {
        list[i].removed = true;
        list.splice(i, 1);
        return;
      }
    }
  }

  class EventTarget {
    addEventListener(type, listener, options) {
      addListener(this, type, listener, options);
    }
    removeEventListener(type, listener, options) {
      removeListener(this, type, listener, options);
    }
    dispatchEvent(event) {
      return dispatch(this, event);
    }
  }

  class Event {
    constructor(type, init) {
      var options = init || {};
      this.type = String(type);
      this.bubbles = !!options.bubbles;
      this.cancelable = !!options.cancelable;
      this.composed = !!options.composed;
      this.defaultPrevented = false;
      this.target = null;
      this.currentTarget = null;
      this.eventPhase = 0;
      this.isTrusted = false;
      this.timeStamp = globalThis.performance.now();
      this.__stop = false;
      this.__stopImmediate = false;
      this.__path = [];
    }
    initEvent(type, bubbles, cancelable) {
      this.type = String(type);
      this.bubbles = !!bubbles;
      this.cancelable = !!cancelable;
    }
    preventDefault() {
      if (this.cancelable) {
        this.defaultPrevented = true;
      }
    }
    stopPropagation() {
      this.__stop = true;
    }
    stopImmediatePropagation() {
      this.__stop = true;
      this.__stopImmediate = true;
    }
    composedPath() {
      return this.__path.slice();
    }
    get srcElement() {
      return this.target;
    }
    get returnValue() {
      return !this.defaultPrevented;
    }
    set returnValue(value) {
      if (value === false) {
        this.preventDefault();
      }
    }
    get cancelBubble() {
      return this.__stop;
    }
    set cancelBubble(value) {
      if (value) {
        this.__stop = true;
      }
    }
  }
  Event.NONE = 0;
  Event.CAPTURING_PHASE = 1;
  Event.AT_TARGET = 2;
  Event.BUBBLING_PHASE = 3;

  class CustomEvent extends Event {
    constructor(type, init) {
      super(type, init);
      this.detail = init && init.detail !== undefined ? init.detail : null;
    }
  }

  class UIEvent extends Event {
    constructor(type, init) {
      super(type, init);
      this.detail = (init && init.detail) || 0;
      this.view = (init && init.view) || null;
    }
  }

  class MouseEvent extends UIEvent {
    constructor(type, init) {
      super(type, init);
      var options = init || {};
      this.button = options.button || 0;
      this.buttons = options.buttons || 0;
      this.clientX = options.clientX || 0;
      this.clientY = options.clientY || 0;
      this.screenX = options.screenX || 0;
      this.screenY = options.screenY || 0;
      this.ctrlKey = !!options.ctrlKey;
      this.shiftKey = !!options.shiftKey;
      this.altKey = !!options.altKey;
      this.metaKey = !!options.metaKey;
    }
  }

  class KeyboardEvent extends UIEvent {
    constructor(type, init) {
      super(type, init);
      var options = init || {};
      this.key = options.key || "";
      this.code = options.code || "";
      this.ctrlKey = !!options.ctrlKey;
      this.shiftKey = !!options.shiftKey;
      this.altKey = !!options.altKey;
      this.metaKey = !!options.metaKey;
    }
  }

  function propagationPath(target) {
    var path = [];
    var node = target;
    while (node) {
      path.push(node);
      node = node === globalThis ? null : node.parentNode;
    }
    var top = path[path.length - 1];
    if (top && top !== globalThis && top.nodeType === DOCUMENT_NODE) {
      path.push(globalThis);
    }
    return path;
  }

  function callListener(node, listener, event) {
    try {
      if (typeof listener === "function") {
        return listener.call(node, event);
      }
      return listener.handleEvent(event);
    } catch (error) {
      globalThis.__pv_report_error(error);
      return undefined;
    }
  }

  function inlineHandler(node, type) {
    var property = node["on" + type];
    if (typeof property === "function") {
      return property;
    }
    var owner = node;
    if (node === globalThis) {
      owner = BODY_FORWARDED_EVENTS[type] && documentNode ? documentNode.body : null;
      if (!owner) {
        return null;
      }
    } else if (node.nodeType !== ELEMENT_NODE) {
      return null;
    } else if (BODY_FORWARDED_EVENTS[type] && documentNode && node === documentNode.body) {
      return null;
    }
    var code = owner.getAttribute("on" + type);
    if (code == null) {
      return null;
    }
    try {
      return new Function("event", code);
    } catch (error) {
      globalThis.__pv_report_error(error);
      return null;
    }
  }

  function invokeListeners(node, event, phase) {
    event.currentTarget = node;
    event.eventPhase = phase;
    var map = listenerMap(node, false);
    var list = map && map[event.type] ? map[event.type].slice() : [];
    for (var i = 0; i < list.length; i += 1) {
      var entry = list[i];
      if (entry.removed || (phase === 1 && !entry.capture) || (phase === 3 && entry.capture)) {
        continue;
      }
      if (entry.once) {
        removeListener(node, event.type, entry.listener, entry.capture);
      }
      callListener(node, entry.listener, event);
      if (event.__stopImmediate) {
        return;
      }
    }
    if (phase !== 1) {
      var handler = inlineHandler(node, event.type);
      if (handler && callListener(node, handler, event) === false) {
        event.preventDefault();
      }
    }
  }

  function dispatch(target, event) {
    if (!event || typeof event.type !== "string") {
      throw new TypeError("Failed to execute 'dispatchEvent': parameter 1 is not of type 'Event'.");
    }
    var path = propagationPath(target);
    event.target = target;
    event.__path = path;
    event.__stop = false;
    event.__stopImmediate = false;
    for (var i = path.length - 1; i > 0 && !event.__stop; i -= 1) {
      invokeListeners(path[i], event, 1);
    }
    if (!event.__stop) {
      invokeListeners(target, event, 2);
    }
    if (event.bubbles) {
      for (var j = 1; j < path.length && !event.__stop; j += 1) {
        invokeListeners(path[j], event, 3);
      }
    }
    event.currentTarget = null;
    event.eventPhase = 0;
    return !event.defaultPrevented;
  }

  // ---- mutation observers -------------------------------------------------

  function isInclusiveAncestor(ancestor, node) {
    var current = node;
    while (current) {
      if (current === ancestor) {
        return true;
      }
      current = current.parentNode;
    }
    return false;
  }

  function makeRecord(type, target, fields) {
    return {
      type: type,
      target: target,
      addedNodes: fields.added || [],
      removedNodes: fields.removed || [],
      previousSibling: fields.previous || null,
      nextSibling: fields.next || null,
      attributeName: fields.attributeName || null,
      attributeNamespace: null,
      oldValue: fields.oldValue === undefined ? null : fields.oldValue
    };
  }

  function queueRecord(record) {
    state.version += 1;
    for (var i = 0; i < state.registrations.length; i += 1) {
      var registration = state.registrations[i];
      var options = registration.options;
      if (record.target !== registration.target
        && !(options.subtree && isInclusiveAncestor(registration.target, record.target))) {
        continue;
      }
      if (record.type === "childList" && !options.childList) {
        continue;
      }
      if (record.type === "attributes") {
        if (!options.attributes) {
          continue;
        }
        if (options.attributeFilter && options.attributeFilter.indexOf(record.attributeName) < 0) {
          continue;
        }
      }
      if (record.type === "characterData" && !options.characterData) {
        continue;
      }
      var observer = registration.observer;
      if (observer.__records.indexOf(record) >= 0) {
        continue;
      }
      observer.__records.push(record);
      if (state.pending.indexOf(observer) < 0) {
        state.pending.push(observer);
      }
    }
  }

  class MutationObserver {
    constructor(callback) {
      if (typeof callback !== "function") {
        throw new TypeError("Failed to construct 'MutationObserver': parameter 1 is not of type 'Function'.");
      }
      this.__callback = callback;
      this.__records = [];
    }
    observe(target, init) {
      if (!target || typeof target.nodeType !== "number") {
        throw new TypeError("Failed to execute 'observe' on 'MutationObserver': parameter 1 is not of type 'Node'.");
      }
      var input = init || {};
      var options = {
        childList: !!input.childList,
        attributes: !!input.attributes || !!input.attributeOldValue || input.attributeFilter !== undefined,
        characterData: !!input.characterData || !!input.characterDataOldValue,
        subtree: !!input.subtree,
        attributeFilter: Array.isArray(input.attributeFilter)
          ? input.attributeFilter.map(function (name) { return String(name).toLowerCase(); })
          : null
      };
      if (!options.childList && !options.attributes && !options.characterData) {
        throw new TypeError("The options object must set at least one of 'attributes', 'characterData', or 'childList' to true.");
      }
      for (var i = 0; i < state.registrations.length; i += 1) {
        var existing = state.registrations[i];
        if (existing.observer === this && existing.target === target) {
          existing.options = options;
          return;
        }
      }
      state.registrations.push({ observer: this, target: target, options: options });
    }
    disconnect() {
      var self = this;
      state.registrations = state.registrations.filter(function (registration) {
        return registration.observer !== self;
      });
      this.__records = [];
    }
    takeRecords() {
      var records = this.__records;
      this.__records = [];
      return records;
    }
  }

  // Delivers queued records once per observer; returns how many callbacks ran.
  globalThis.__pv_deliver_mutations = function () {
    var observers = state.pending;
    state.pending = [];
    var delivered = 0;
    for (var i = 0; i < observers.length; i += 1) {
      var observer = observers[i];
      var records = observer.takeRecords();
      if (records.length === 0) {
        continue;
      }
      delivered += 1;
      try {
        observer.__callback.call(observer, records, observer);
      } catch (error) {
        globalThis.__pv_report_error(error);
      }
    }
    return delivered;
  };

  // ---- tree operations ----------------------------------------------------

  function isElement(node) {
    return !!node && node.nodeType === ELEMENT_NODE;
  }

  function descendants(root) {
    var out = [];
    var stack = root.childNodes.slice().reverse();
    while (stack.length > 0) {
      var node = stack.pop();
      out.push(node);
      for (var i = node.childNodes.length - 1; i >= 0; i -= 1) {
        stack.push(node.childNodes[i]);
      }
    }
    return out;
  }

  function collectText(node) {
    if (node.nodeType === TEXT_NODE || node.nodeType === COMMENT_NODE) {
      return node.__data;
    }
    var out = "";
    var all = descendants(node);
    for (var i = 0; i < all.length; i += 1) {
      if (all[i].nodeType === TEXT_NODE) {
        out += all[i].__data;
      }
    }
    return out;
  }

  function toNodes(args) {
    var out = [];
    for (var i = 0; i < args.length; i += 1) {
      var item = args[i];
      out.push(item instanceof Node ? item : new Text(String(item)));
    }
    return out;
  }

  function detach(node) {
    var parent = node.parentNode;
    if (!parent) {
      return;
    }
    var index = parent.childNodes.indexOf(node);
    node.parentNode = null;
    if (index < 0) {
      return;
    }
    var previous = index > 0 ? parent.childNodes[index - 1] : null;
    var next = index + 1 < parent.childNodes.length ? parent.childNodes[index + 1] : null;
    parent.childNodes.splice(index, 1);
    queueRecord(makeRecord("childList", parent, { removed: [node], previous: previous, next: next }));
  }

  function insertNodes(parent, nodes, reference) {
    var list = [];
    for (var i = 0; i < nodes.length; i += 1) {
      var node = nodes[i];
      if (!(node instanceof Node)) {
        throw new TypeError("Failed to execute 'insertBefore' on 'Node': parameter 1 is not of type 'Node'.");
      }
      if (isInclusiveAncestor(node, parent)) {
        throw new Error("HierarchyRequestError: The new child element contains the parent.");
      }
      if (node.nodeType === DOCUMENT_FRAGMENT_NODE) {
        var kids = node.childNodes.slice();
        for (var k = 0; k < kids.length; k += 1) {
          detach(kids[k]);
        }
        list = list.concat(kids);
      } else {
        list.push(node);
      }
    }
    for (var j = 0; j < list.length; j += 1) {
      if (list[j].parentNode) {
        detach(list[j]);
      }
    }
    var anchor = reference && reference.parentNode === parent ? reference : null;
    var index = anchor ? parent.childNodes.indexOf(anchor) : parent.childNodes.length;
    var previous = index > 0 ? parent.childNodes[index - 1] : null;
    for (var m = 0; m < list.length; m += 1) {
      parent.childNodes.splice(index + m, 0, list[m]);
      list[m].parentNode = parent;
    }
    if (list.length > 0) {
      queueRecord(makeRecord("childList", parent, { added: list, previous: previous, next: anchor }));
    }
    return list;
  }

  function replaceAllChildren(parent, nodes) {
    var removed = parent.childNodes.slice();
    for (var i = 0; i < removed.length; i += 1) {
      removed[i].parentNode = null;
    }
    parent.childNodes = [];
    var added = [];
    for (var j = 0; j < nodes.length; j += 1) {
      if (nodes[j].parentNode) {
        detach(nodes[j]);
      }
      nodes[j].parentNode = parent;
      parent.childNodes.push(nodes[j]);
      added.push(nodes[j]);
    }
    if (removed.length > 0 || added.length > 0) {
      queueRecord(makeRecord("childList", parent, { removed: removed, added: added }));
    }
  }

  function sibling(node, offset) {
    var parent = node.parentNode;
    if (!parent) {
      return null;
    }
    var index = parent.childNodes.indexOf(node) + offset;
    return index >= 0 && index < parent.childNodes.length ? parent.childNodes[index] : null;
  }

  function elementSibling(node, offset) {
    var current = sibling(node, offset);
    while (current && current.nodeType !== ELEMENT_NODE) {
      current = sibling(current, offset);
    }
    return current;
  }

  class Node extends EventTarget {
    constructor(type, name) {
      super();
      this.nodeType = type;
      this.nodeName = name;
      this.parentNode = null;
      this.childNodes = [];
    }
    get ownerDocument() {
      return this.nodeType === DOCUMENT_NODE ? null : documentNode;
    }
    get parentElement() {
      return isElement(this.parentNode) ? this.parentNode : null;
    }
    get firstChild() {
      return this.childNodes.length > 0 ? this.childNodes[0] : null;
    }
    get lastChild() {
      return this.childNodes.length > 0 ? this.childNodes[this.childNodes.length - 1] : null;
    }
    get nextSibling() {
      return sibling(this, 1);
    }
    get previousSibling() {
      return sibling(this, -1);
    }
    get isConnected() {
      return this.getRootNode() === documentNode;
    }
    get nodeValue() {
      return null;
    }
    set nodeValue(_value) {}
    get textContent() {
      return collectText(this);
    }
    set textContent(value) {
      var text = value == null ? "" : String(value);
      replaceAllChildren(this, text ? [new Text(text)] : []);
    }
    hasChildNodes() {
      return this.childNodes.length > 0;
    }
    contains(other) {
      return !!other && isInclusiveAncestor(this, other);
    }
    getRootNode() {
      var node = this;
      while (node.parentNode) {
        node = node.parentNode;
      }
      return node;
    }
    appendChild(child) {
      insertNodes(this, [child], null);
      return child;
    }
    insertBefore(child, reference) {
      insertNodes(this, [child], reference || null);
      return child;
    }
    removeChild(child) {
      if (!child || child.parentNode !== this) {
        throw new Error("NotFoundError: The node to be removed is not a child of this node.");
      }
      detach(child);
      return child;
    }
    replaceChild(newChild, oldChild) {
      if (!oldChild || oldChild.parentNode !== this) {
        throw new Error("NotFoundError: The node to be replaced is not a child of this node.");
      }
      var next = oldChild.nextSibling === newChild ? newChild.nextSibling : oldChild.nextSibling;
      detach(oldChild);
      insertNodes(this, [newChild], next);
      return oldChild;
    }
    cloneNode(deep) {
      return cloneNode(this, !!deep);
    }
    isSameNode(other) {
      return this === other;
    }
    isEqualNode(other) {
      return !!other && other.nodeType === this.nodeType && serializeNode(this) === serializeNode(other);
    }
    normalize() {}
  }
  Node.ELEMENT_NODE = ELEMENT_NODE;
  Node.TEXT_NODE = TEXT_NODE;
  Node.COMMENT_NODE = COMMENT_NODE;
  Node.DOCUMENT_NODE = DOCUMENT_NODE;
  Node.DOCUMENT_TYPE_NODE = DOCUMENT_TYPE_NODE;
  Node.DOCUMENT_FRAGMENT_NODE = DOCUMENT_FRAGMENT_NODE;

  function setData(node, value) {
    var old = node.__data;
    node.__data = value == null ? "" : String(value);
    queueRecord(makeRecord("characterData", node, { oldValue: old }));
  }

  class CharacterData extends Node {
    constructor(type, name, data) {
      super(type, name);
      this.__data = data == null ? "" : String(data);
    }
    get data() {
      return this.__data;
    }
    set data(value) {
      setData(this, value);
    }
    get nodeValue() {
      return this.__data;
    }
    set nodeValue(value) {
      setData(this, value);
    }
    get textContent() {
      return this.__data;
    }
    set textContent(value) {
      setData(this, value);
    }
    get length() {
      return this.__data.length;
    }
    appendData(data) {
      setData(this, this.__data + String(data));
    }
    substringData(offset, count) {
      return this.__data.substr(offset, count);
    }
  }

  class Text extends CharacterData {
    constructor(data) {
      super(TEXT_NODE, "#text", data);
    }
    get wholeText() {
      return this.__data;
    }
  }

  class Comment extends CharacterData {
    constructor(data) {
      super(COMMENT_NODE, "#comment", data);
    }
  }

  class DocumentType extends Node {
    constructor(name) {
      super(DOCUMENT_TYPE_NODE, String(name));
      this.name = String(name);
      this.publicId = "";
      this.systemId = "";
    }
    get textContent() {
      return null;
    }
    set textContent(_value) {}
  }

  class DocumentFragment extends Node {
    constructor() {
      super(DOCUMENT_FRAGMENT_NODE, "#document-fragment");
    }
  }

  // ---- selectors ----------------------------------------------------------

  var selectorCache = Object.create(null);

  function selectorError(source) {
    return new SyntaxError("'" + source + "' is not a valid selector.");
  }

  function parseAttributeSelector(body, source) {
    var match = /^\s*([^\s~|^$*!=]+)\s*(?:([~|^$*]?=)\s*(?:"([^"]*)"|'([^']*)'|([^\s\]]*))\s*(i)?)?\s*$/.exec(body);
    if (!match) {
      throw selectorError(source);
    }
    var value = match[3] !== undefined ? match[3] : match[4] !== undefined ? match[4] : match[5];
    return {
      name: match[1].toLowerCase(),
      op: match[2] || null,
      value: value === undefined ? null : value,
      insensitive: !!match[6]
    };
  }

  function parseSelectorList(text) {
    var source = String(text).trim();
    if (selectorCache[source]) {
      return selectorCache[source];
    }
    var groups = [];
    var steps = [];
    var current = null;
    var combinator = " ";
    var i = 0;

    function compound() {
      if (!current) {
        current = {
          tag: null,
          id: null,
          classes: [],
          attrs: [],
          pseudos: [],
          combinator: steps.length > 0 ? combinator : null
        };
        combinator = " ";
      }
      return current;
    }
    function finish() {
      if (current) {
        steps.push(current);
        current = null;
      }
    }
    function ident() {
      var start = i;
      while (i < source.length && /[A-Za-z0-9_\-\u00a0-\uffff]/.test(source.charAt(i))) {
        i += 1;
      }
      return source.slice(start, i);
    }

    while (i < source.length) {
      var ch = source.charAt(i);
      if (/\s/.test(ch)) {
        finish();
        i += 1;
        continue;
      }
      if (ch === ">" || ch === "+" || ch === "~") {
        finish();
        combinator = ch;
        i += 1;
        continue;
      }
      if (ch === ",") {
        finish();
        if (steps.length === 0) {
          throw selectorError(source);
        }
        groups.push(steps);
        steps = [];
        combinator = " ";
        i += 1;
        continue;
      }
      if (ch === "*") {
        compound().tag = "*";
        i += 1;
        continue;
      }
      if (ch === "#") {
        i += 1;
        compound().id = ident();
        continue;
      }
      if (ch === ".") {
        i += 1;
        compound().classes.push(ident());
        continue;
      }
      if (ch === "[") {
        var end = source.indexOf("]", i);
        if (end < 0) {
          throw selectorError(source);
        }
        compound().attrs.push(parseAttributeSelector(source.slice(i + 1, end), source));
        i = end + 1;
        continue;
      }
      if (ch === ":") {
        i += 1;
        if (source.charAt(i) === ":") {
          i += 1;
        }
        var name = ident().toLowerCase();
        var arg = null;
        if (source.charAt(i) === "(") {
          var depth = 1;
          var argStart = i + 1;
          i += 1;
          while (i < source.length && depth > 0) {
            if (source.charAt(i) === "(") {
              depth += 1;
            } else if (source.charAt(i) === ")") {
              depth -= 1;
            }
            i += 1;
          }
          arg = source.slice(argStart, i - 1);
        }
        compound().pseudos.push({ name: name, arg: arg });
        continue;
      }
      var tag = ident();
      if (!tag) {
        throw selectorError(source);
      }
      compound().tag = tag.toLowerCase();
    }
    finish();
    if (steps.length === 0) {
      throw selectorError(source);
    }
    groups.push(steps);
    selectorCache[source] = groups;
    return groups;
  }

  function hasClass(element, name) {
    var value = element.getAttribute("class");
    return !!value && value.split(/\s+/).indexOf(name) >= 0;
  }

  function matchAttribute(element, selector) {
    var actual = element.getAttribute(selector.name);
    if (actual === null) {
      return false;
    }
    if (!selector.op) {
      return true;
    }
    var expected = selector.value;
    if (selector.insensitive) {
      actual = actual.toLowerCase();
      expected = expected.toLowerCase();
    }
    switch (selector.op) {
      case "=":
        return actual === expected;
      case "~=":
        return actual.split(/\s+/).indexOf(expected) >= 0;
      case "|=":
        return actual === expected || actual.indexOf(expected + "-") === 0;
      case "^=":
        return expected !== "" && actual.indexOf(expected) === 0;
      case "$=":
        return expected !== "" && actual.slice(-expected.length) === expected;
      case "*=":
        return expected !== "" && actual.indexOf(expected) >= 0;
      default:
        return false;
    }
  }

  function elementIndex(element) {
    var index = 0;
    var current = element.previousElementSibling;
    while (current) {
      index += 1;
      current = current.previousElementSibling;
    }
    return index;
  }

  function matchPseudo(element, pseudo) {
    switch (pseudo.name) {
      case "first-child":
        return !element.previousElementSibling;
      case "last-child":
        return !element.nextElementSibling;
      case "only-child":
        return !element.previousElementSibling && !element.nextElementSibling;
      case "nth-child": {
        var arg = String(pseudo.arg || "").trim().toLowerCase();
        var position = elementIndex(element) + 1;
        if (arg === "odd") {
          return position % 2 === 1;
        }
        if (arg === "even") {
          return position % 2 === 0;
        }
        return position === parseInt(arg, 10);
      }
      case "not":
        return !matchesAny(element, parseSelectorList(pseudo.arg || ""));
      case "checked":
        return element.hasAttribute("checked") || element.hasAttribute("selected");
      case "disabled":
        return element.hasAttribute("disabled");
      case "enabled":
        return !element.hasAttribute("disabled");
      case "empty":
        return element.childNodes.length === 0;
      case "root":
        return element === documentNode.documentElement;
      case "scope":
        return true;
      default:
        return false;
    }
  }

  function matchCompound(element, step) {
    if (step.tag && step.tag !== "*" && element.localName !== step.tag) {
      return false;
    }
    if (step.id !== null && element.getAttribute("id") !== step.id) {
      return false;
    }
    for (var i = 0; i < step.classes.length; i += 1) {
      if (!hasClass(element, step.classes[i])) {
        return false;
      }
    }
    for (var j = 0; j < step.attrs.length; j += 1) {
      if (!matchAttribute(element, step.attrs[j])) {
        return false;
      }
    }
    for (var k = 0; k < step.pseudos.length; k += 1) {
      if (!matchPseudo(element, step.pseudos[k])) {
        return false;
      }
    }
    return true;
  }

  function matchSteps(element, steps, index) {
    if (!matchCompound(element, steps[index])) {
      return false;
    }
    if (index === 0) {
      return true;
    }
    var combinator = steps[index].combinator;
    if (combinator === ">") {
      var parent = element.parentElement;
      return !!parent && matchSteps(parent, steps, index - 1);
    }
    if (combinator === "+") {
      var previous = element.previousElementSibling;
      return !!previous && matchSteps(previous, steps, index - 1);
    }
    if (combinator === "~") {
      var sib = element.previousElementSibling;
      while (sib) {
        if (matchSteps(sib, steps, index - 1)) {
          return true;
        }
        sib = sib.previousElementSibling;
      }
      return false;
    }
    var ancestor = element.parentElement;
    while (ancestor) {
      if (matchSteps(ancestor, steps, index - 1)) {
        return true;
      }
      ancestor = ancestor.parentElement;
    }
    return false;
  }

  function matchesAny(element, groups) {
    for (var i = 0; i < groups.length; i += 1) {
      if (matchSteps(element, groups[i], groups[i].length - 1)) {
        return true;
      }
    }
    return false;
  }

  function querySelectorAllFrom(root, selector) {
    var groups = parseSelectorList(selector);
    return descendants(root).filter(function (node) {
      return isElement(node) && matchesAny(node, groups);
    });
  }

  // ---- serialization and snapshots ----------------------------------------

  function escapeText(value) {
    return String(value)
      .replace(/&/g, "&amp;")
      .replace(/</g, "&lt;")
      .replace(/>/g, "&gt;")
      .replace(/\u00a0/g, "&nbsp;");
  }

  function escapeAttribute(value) {
    return String(value)
      .replace(/&/g, "&amp;")
      .replace(/"/g, "&quot;")
      .replace(/\u00a0/g, "&nbsp;");
  }

  function serializeChildren(node) {
    var out = "";
    for (var i = 0; i < node.childNodes.length; i += 1) {
      out += serializeNode(node.childNodes[i]);
    }
    return out;
  }

  function serializeNode(node) {
    switch (node.nodeType) {
      case ELEMENT_NODE: {
        var out = "<" + node.localName;
        for (var i = 0; i < node.__attrs.length; i += 1) {
          out += " " + node.__attrs[i][0] + "=\"" + escapeAttribute(node.__attrs[i][1]) + "\"";
        }
        out += ">";
        if (VOID_ELEMENTS[node.localName]) {
          return out;
        }
        return out + serializeChildren(node) + "</" + node.localName + ">";
      }
      case TEXT_NODE: {
        var parent = node.parentNode;
        if (isElement(parent) && RAW_TEXT_ELEMENTS[parent.localName]) {
          return node.__data;
        }
        return escapeText(node.__data);
      }
      case COMMENT_NODE:
        return "<!--" + node.__data + "-->";
      case DOCUMENT_TYPE_NODE:
        return "<!DOCTYPE " + node.name + ">";
      default:
        return serializeChildren(node);
    }
  }

  function markNode(node, marker) {
    Object.defineProperty(node, "__pvMarker", { value: String(marker), enumerable: false });
  }

  function markStarted(node) {
    Object.defineProperty(node, "__pvStarted", { value: true, enumerable: false });
  }

  function build(snapshot) {
    switch (snapshot && snapshot.t) {
      case "element": {
        var element = new Element(snapshot.name);
        var attrs = snapshot.attrs || [];
        for (var i = 0; i < attrs.length; i += 1) {
          element.__attrs.push([String(attrs[i][0]), String(attrs[i][1])]);
        }
        if (snapshot.marker) {
          markNode(element, snapshot.marker);
        }
        var children = snapshot.children || [];
        for (var j = 0; j < children.length; j += 1) {
          var child = build(children[j]);
          if (child) {
            child.parentNode = element;
            element.childNodes.push(child);
          }
        }
        return element;
      }
      case "text":
        return new Text(snapshot.data);
      case "comment":
        return new Comment(snapshot.data);
      case "doctype":
        return new DocumentType(snapshot.name);
      default:
        return null;
    }
  }

  function exportNode(node) {
    switch (node.nodeType) {
      case ELEMENT_NODE: {
        var out = {
          t: "element",
          name: node.localName,
          attrs: node.__attrs.map(function (pair) { return [pair[0], pair[1]]; }),
          children: []
        };
        if (node.__pvMarker) {
          out.marker = node.__pvMarker;
        }
        for (var i = 0; i < node.childNodes.length; i += 1) {
          var child = exportNode(node.childNodes[i]);
          if (child) {
            out.children.push(child);
          }
        }
        return out;
      }
      case TEXT_NODE:
        return { t: "text", data: node.__data };
      case COMMENT_NODE:
        return { t: "comment", data: node.__data };
      case DOCUMENT_TYPE_NODE:
        return { t: "doctype", name: node.name };
      default:
        return null;
    }
  }

  function parseFragment(markup) {
    var json = globalThis.__pv_parse_fragment(String(markup == null ? "" : markup));
    var snapshots = JSON.parse(json);
    var nodes = [];
    for (var i = 0; i < snapshots.length; i += 1) {
      var node = build(snapshots[i]);
      if (node) {
        nodes.push(node);
      }
    }
    return nodes;
  }

  function cloneNode(node, deep) {
    var copy;
    switch (node.nodeType) {
      case ELEMENT_NODE:
        copy = new Element(node.localName);
        copy.__attrs = node.__attrs.map(function (pair) { return [pair[0], pair[1]]; });
        if (node.__pvStarted) {
          markStarted(copy);
        }
        break;
      case TEXT_NODE:
        copy = new Text(node.__data);
        break;
      case COMMENT_NODE:
        copy = new Comment(node.__data);
        break;
      case DOCUMENT_TYPE_NODE:
        copy = new DocumentType(node.name);
        break;
      case DOCUMENT_FRAGMENT_NODE:
        copy = new DocumentFragment();
        break;
      default:
        throw new Error("NotSupportedError: Document nodes cannot be cloned.");
    }
    if (deep) {
      for (var i = 0; i < node.childNodes.length; i += 1) {
        var child = cloneNode(node.childNodes[i], true);
        child.parentNode = copy;
        copy.childNodes.push(child);
      }
    }
    return copy;
  }

  // ---- elements -----------------------------------------------------------

  function attributeIndex(element, name) {
    var key = String(name).toLowerCase();
    for (var i = 0; i < element.__attrs.length; i += 1) {
      if (element.__attrs[i][0] === key) {
        return i;
      }
    }
    return -1;
  }

  function setAttribute(element, name, value) {
    var key = String(name).toLowerCase();
    if (!key || /[\s"'>\/=]/.test(key)) {
      throw new Error("InvalidCharacterError: '" + name + "' is not a valid attribute name.");
    }
    var index = attributeIndex(element, key);
    var old = index >= 0 ? element.__attrs[index][1] : null;
    var text = String(value);
    if (index >= 0) {
      element.__attrs[index][1] = text;
    } else {
      element.__attrs.push([key, text]);
    }
    queueRecord(makeRecord("attributes", element, { attributeName: key, oldValue: old }));
  }

  function toKebab(key) {
    if (key.indexOf("-") >= 0) {
      return key.toLowerCase();
    }
    return key.replace(/[A-Z]/g, function (c) { return "-" + c.toLowerCase(); });
  }

  function makeClassList(element) {
    function tokens() {
      var value = element.getAttribute("class");
      return value ? value.split(/\s+/).filter(Boolean) : [];
    }
    function write(list) {
      element.setAttribute("class", list.join(" "));
    }
    return {
      get length() {
        return tokens().length;
      },
      get value() {
        return element.getAttribute("class") || "";
      },
      item: function (index) {
        var list = tokens();
        return index >= 0 && index < list.length ? list[index] : null;
      },
      contains: function (token) {
        return tokens().indexOf(String(token)) >= 0;
      },
      add: function () {
        var list = tokens();
        for (var i = 0; i < arguments.length; i += 1) {
          var token = String(arguments[i]);
          if (list.indexOf(token) < 0) {
            list.push(token);
          }
        }
        write(list);
      },
      remove: function () {
        var drop = Array.prototype.map.call(arguments, String);
        write(tokens().filter(function (token) { return drop.indexOf(token) < 0; }));
      },
      toggle: function (token, force) {
        var key = String(token);
        var present = tokens().indexOf(key) >= 0;
        var want = force === undefined ? !present : !!force;
        if (want && !present) {
          this.add(key);
        } else if (!want && present) {
          this.remove(key);
        }
        return want;
      },
      replace: function (oldToken, newToken) {
        var list = tokens();
        var index = list.indexOf(String(oldToken));
        if (index < 0) {
          return false;
        }
        list[index] = String(newToken);
        write(list);
        return true;
      },
      forEach: function (callback, thisArg) {
        tokens().forEach(callback, thisArg);
      },
      toString: function () {
        return element.getAttribute("class") || "";
      }
    };
  }

  function makeStyle(element) {
    function read() {
      var text = element.getAttribute("style") || "";
      var out = [];
      var parts = text.split(";");
      for (var i = 0; i < parts.length; i += 1) {
        var colon = parts[i].indexOf(":");
        if (colon <= 0) {
          continue;
        }
        out.push([parts[i].slice(0, colon).trim().toLowerCase(), parts[i].slice(colon + 1).trim()]);
      }
      return out;
    }
    function write(declarations) {
      if (declarations.length === 0) {
        element.removeAttribute("style");
        return;
      }
      element.setAttribute("style", declarations.map(function (d) { return d[0] + ": " + d[1] + ";"; }).join(" "));
    }
    function setProperty(property, value) {
      var declarations = read();
      var text = value == null ? "" : String(value).trim();
      var index = -1;
      for (var i = 0; i < declarations.length; i += 1) {
        if (declarations[i][0] === property) {
          index = i;
        }
      }
      if (!text) {
        if (index >= 0) {
          declarations.splice(index, 1);
          write(declarations);
        }
        return;
      }
      if (index >= 0) {
        declarations[index][1] = text;
      } else {
        declarations.push([property, text]);
      }
      write(declarations);
    }
    var api = {
      getPropertyValue: function (property) {
        var key = String(property).toLowerCase();
        var declarations = read();
        for (var i = 0; i < declarations.length; i += 1) {
          if (declarations[i][0] === key) {
            return declarations[i][1];
          }
        }
        return "";
      },
      setProperty: function (property, value) {
        setProperty(String(property).toLowerCase(), value);
      },
      removeProperty: function (property) {
        var old = api.getPropertyValue(property);
        setProperty(String(property).toLowerCase(), "");
        return old;
      }
    };
    return new Proxy(api, {
      get: function (target, key) {
        if (typeof key !== "string") {
          return undefined;
        }
        if (key in target) {
          return target[key];
        }
        if (key === "cssText") {
          return element.getAttribute("style") || "";
        }
        if (key === "length") {
          return read().length;
        }
        return api.getPropertyValue(toKebab(key));
      },
      set: function (_target, key, value) {
        if (typeof key !== "string") {
          return true;
        }
        if (key === "cssText") {
          var text = value == null ? "" : String(value).trim();
          if (text) {
            element.setAttribute("style", text);
          } else {
            element.removeAttribute("style");
          }
          return true;
        }
        setProperty(toKebab(key), value);
        return true;
      }
    });
  }

  function insertAdjacent(element, position, nodes) {
    switch (String(position).toLowerCase()) {
      case "beforebegin":
        if (element.parentNode) {
          insertNodes(element.parentNode, nodes, element);
        }
        return;
      case "afterbegin":
        insertNodes(element, nodes, element.firstChild);
        return;
      case "beforeend":
        insertNodes(element, nodes, null);
        return;
      case "afterend":
        if (element.parentNode) {
          insertNodes(element.parentNode, nodes, element.nextSibling);
        }
        return;
      default:
        throw new SyntaxError("The value provided ('" + position + "') is not one of 'beforeBegin', 'afterBegin', 'beforeEnd', or 'afterEnd'.");
    }
  }

  function isSubmitButton(element) {
    var type = (element.getAttribute("type") || "").toLowerCase();
    if (element.localName === "button") {
      return type === "" || type === "submit";
    }
    return element.localName === "input" && (type === "submit" || type === "image");
  }

  function submitForm(form, submitter) {
    var event = new Event("submit", { bubbles: true, cancelable: true });
    event.submitter = submitter || null;
    if (dispatch(form, event)) {
      requestNavigation("form", form.getAttribute("action") || globalThis.location.href);
    }
  }

  // Default action of a click that nobody cancelled.
  function activate(element) {
    var anchor = element.closest("a[href], area[href]");
    if (anchor) {
      requestNavigation("anchor", anchor.getAttribute("href"));
      return;
    }
    var control = element.closest("button, input");
    if (control && isSubmitButton(control)) {
      var form = control.closest("form");
      if (form) {
        submitForm(form, control);
      }
    }
  }

  class Element extends Node {
    constructor(name) {
      var local = String(name).toLowerCase();
      super(ELEMENT_NODE, local.toUpperCase());
      this.localName = local;
      this.namespaceURI = "http://www.w3.org/1999/xhtml";
      this.__attrs = [];
      this.__style = null;
    }
    get tagName() {
      return this.nodeName;
    }
    getAttribute(name) {
      var index = attributeIndex(this, name);
      return index < 0 ? null : this.__attrs[index][1];
    }
    setAttribute(name, value) {
      setAttribute(this, name, value);
    }
    removeAttribute(name) {
      var index = attributeIndex(this, name);
      if (index < 0) {
        return;
      }
      var removed = this.__attrs.splice(index, 1)[0];
      queueRecord(makeRecord("attributes", this, { attributeName: removed[0], oldValue: removed[1] }));
    }
    hasAttribute(name) {
      return attributeIndex(this, name) >= 0;
    }
    hasAttributes() {
      return this.__attrs.length > 0;
    }
    toggleAttribute(name, force) {
      var present = this.hasAttribute(name);
      var want = force === undefined ? !present : !!force;
      if (want && !present) {
        this.setAttribute(name, "");
      } else if (!want && present) {
        this.removeAttribute(name);
      }
      return want;
    }
    getAttributeNames() {
      return this.__attrs.map(function (pair) { return pair[0]; });
    }
    get attributes() {
      var list = this.__attrs.map(function (pair) {
        return { name: pair[0], localName: pair[0], value: pair[1], nodeName: pair[0], nodeValue: pair[1] };
      });
      list.getNamedItem = function (name) {
        var key = String(name).toLowerCase();
        for (var i = 0; i < list.length; i += 1) {
          if (list[i].name === key) {
            return list[i];
          }
        }
        return null;
      };
      return list;
    }
    get id() {
      return this.getAttribute("id") || "";
    }
    set id(value) {
      this.setAttribute("id", value);
    }
    get className() {
      return this.getAttribute("class") || "";
    }
    set className(value) {
      this.setAttribute("class", value);
    }
    get classList() {
      return makeClassList(this);
    }
    get dataset() {
      var element = this;
      return new Proxy({}, {
        get: function (_target, key) {
          if (typeof key !== "string") {
            return undefined;
          }
          var value = element.getAttribute("data-" + toKebab(key));
          return value === null ? undefined : value;
        },
        set: function (_target, key, value) {
          if (typeof key === "string") {
            element.setAttribute("data-" + toKebab(key), value);
          }
          return true;
        },
        has: function (_target, key) {
          return typeof key === "string" && element.hasAttribute("data-" + toKebab(key));
        },
        deleteProperty: function (_target, key) {
          if (typeof key === "string") {
            element.removeAttribute("data-" + toKebab(key));
          }
          return true;
        }
      });
    }
    get style() {
      if (!this.__style) {
        this.__style = makeStyle(this);
      }
      return this.__style;
    }
    set style(value) {
      this.style.cssText = value;
    }
    get innerHTML() {
      return serializeChildren(this);
    }
    set innerHTML(markup) {
      if (RAW_TEXT_ELEMENTS[this.localName]) {
        var text = markup == null ? "" : String(markup);
        replaceAllChildren(this, text ? [new Text(text)] : []);
        return;
      }
      replaceAllChildren(this, parseFragment(markup));
    }
    get outerHTML() {
      return serializeNode(this);
    }
    set outerHTML(markup) {
      var parent = this.parentNode;
      if (!parent) {
        return;
      }
      var nodes = parseFragment(markup);
      var next = this.nextSibling;
      detach(this);
      insertNodes(parent, nodes, next);
    }
    get innerText() {
      return this.textContent;
    }
    set innerText(value) {
      this.textContent = value;
    }
    get outerText() {
      return this.textContent;
    }
    get text() {
      return this.textContent;
    }
    set text(value) {
      this.textContent = value;
    }
    insertAdjacentHTML(position, markup) {
      insertAdjacent(this, position, parseFragment(markup));
    }
    insertAdjacentElement(position, element) {
      insertAdjacent(this, position, [element]);
      return element;
    }
    insertAdjacentText(position, text) {
      insertAdjacent(this, position, [new Text(String(text))]);
    }
    matches(selector) {
      return matchesAny(this, parseSelectorList(selector));
    }
    webkitMatchesSelector(selector) {
      return this.matches(selector);
    }
    closest(selector) {
      var groups = parseSelectorList(selector);
      var current = this;
      while (isElement(current)) {
        if (matchesAny(current, groups)) {
          return current;
        }
        current = current.parentNode;
      }
      return null;
    }
    click() {
      if (this.hasAttribute("disabled")) {
        return;
      }
      var event = new MouseEvent("click", { bubbles: true, cancelable: true, button: 0 });
      if (dispatch(this, event)) {
        activate(this);
      }
    }
    submit() {
      if (this.localName === "form") {
        requestNavigation("form", this.getAttribute("action") || globalThis.location.href);
      }
    }
    requestSubmit(submitter) {
      if (this.localName === "form") {
        submitForm(this, submitter || null);
      }
    }
    reset() {}
    focus() {}
    blur() {}
    scrollIntoView() {}
    getBoundingClientRect() {
      return { x: 0, y: 0, width: 0, height: 0, top: 0, left: 0, right: 0, bottom: 0 };
    }
    getClientRects() {
      return [];
    }
  }

  ["href", "src", "type", "name", "rel", "target", "action", "method", "alt", "title", "lang",
    "dir", "placeholder", "content", "charset", "media", "width", "height", "value", "role"].forEach(function (name) {
    Object.defineProperty(Element.prototype, name, {
      configurable: true,
      get: function () {
        var value = this.getAttribute(name);
        return value == null ? "" : value;
      },
      set: function (value) {
        this.setAttribute(name, value);
      }
    });
  });
  Object.defineProperty(Element.prototype, "htmlFor", {
    configurable: true,
    get: function () { return this.getAttribute("for") || ""; },
    set: function (value) { this.setAttribute("for", value); }
  });
  ["hidden", "disabled", "checked", "selected", "async", "defer", "required", "multiple",
    "autofocus", "readOnly"].forEach(function (property) {
    var attribute = property.toLowerCase();
    Object.defineProperty(Element.prototype, property, {
      configurable: true,
      get: function () { return this.hasAttribute(attribute); },
      set: function (value) {
        if (value) {
          this.setAttribute(attribute, "");
        } else {
          this.removeAttribute(attribute);
        }
      }
    });
  });
  ["offsetWidth", "offsetHeight", "offsetTop", "offsetLeft", "clientWidth", "clientHeight",
    "scrollWidth", "scrollHeight", "scrollTop", "scrollLeft"].forEach(function (property) {
    Object.defineProperty(Element.prototype, property, {
      configurable: true,
      get: function () { return 0; },
      set: function () {}
    });
  });

  var parentNodeMixin = {
    get children() {
      return this.childNodes.filter(isElement);
    },
    get childElementCount() {
      return this.childNodes.filter(isElement).length;
    },
    get firstElementChild() {
      var list = this.childNodes.filter(isElement);
      return list.length > 0 ? list[0] : null;
    },
    get lastElementChild() {
      var list = this.childNodes.filter(isElement);
      return list.length > 0 ? list[list.length - 1] : null;
    },
    querySelector: function (selector) {
      var groups = parseSelectorList(selector);
      var all = descendants(this);
      for (var i = 0; i < all.length; i += 1) {
        if (isElement(all[i]) && matchesAny(all[i], groups)) {
          return all[i];
        }
      }
      return null;
    },
    querySelectorAll: function (selector) {
      return querySelectorAllFrom(this, selector);
    },
    getElementsByTagName: function (name) {
      var key = String(name).toLowerCase();
      return descendants(this).filter(function (node) {
        return isElement(node) && (key === "*" || node.localName === key);
      });
    },
    getElementsByClassName: function (names) {
      var wanted = String(names).split(/\s+/).filter(Boolean);
      return descendants(this).filter(function (node) {
        if (!isElement(node) || wanted.length === 0) {
          return false;
        }
        for (var i = 0; i < wanted.length; i += 1) {
          if (!hasClass(node, wanted[i])) {
            return false;
          }
        }
        return true;
      });
    },
    append: function () {
      insertNodes(this, toNodes(arguments), null);
    },
    prepend: function () {
      insertNodes(this, toNodes(arguments), this.firstChild);
    },
    replaceChildren: function () {
      var nodes = toNodes(arguments);
      replaceAllChildren(this, []);
      insertNodes(this, nodes, null);
    }
  };

  var childNodeMixin = {
    get nextElementSibling() {
      return elementSibling(this, 1);
    },
    get previousElementSibling() {
      return elementSibling(this, -1);
    },
    remove: function () {
      if (this.parentNode) {
        detach(this);
      }
    },
    before: function () {
      if (this.parentNode) {
        insertNodes(this.parentNode, toNodes(arguments), this);
      }
    },
    after: function () {
      if (this.parentNode) {
        insertNodes(this.parentNode, toNodes(arguments), this.nextSibling);
      }
    },
    replaceWith: function () {
      var parent = this.parentNode;
      if (!parent) {
        return;
      }
      var nodes = toNodes(arguments);
      var next = this.nextSibling;
      detach(this);
      insertNodes(parent, nodes, next);
    }
  };

  function applyMixin(proto, mixin) {
    Object.defineProperties(proto, Object.getOwnPropertyDescriptors(mixin));
  }

  // ---- document -----------------------------------------------------------

  function childElementNamed(parent, name) {
    if (!parent) {
      return null;
    }
    for (var i = 0; i < parent.childNodes.length; i += 1) {
      var child = parent.childNodes[i];
      if (isElement(child) && child.localName === name) {
        return child;
      }
    }
    return null;
  }

  class Document extends Node {
    constructor() {
      super(DOCUMENT_NODE, "#document");
      this.readyState = "loading";
      this.currentScript = null;
      this.characterSet = "UTF-8";
      this.charset = "UTF-8";
      this.contentType = "text/html";
      this.compatMode = "CSS1Compat";
      this.visibilityState = "visible";
      this.hidden = false;
      this.referrer = "";
    }
    get textContent() {
      return null;
    }
    set textContent(_value) {}
    get documentElement() {
      return this.childNodes.filter(isElement)[0] || null;
    }
    get doctype() {
      for (var i = 0; i < this.childNodes.length; i += 1) {
        if (this.childNodes[i].nodeType === DOCUMENT_TYPE_NODE) {
          return this.childNodes[i];
        }
      }
      return null;
    }
    get head() {
      return childElementNamed(this.documentElement, "head");
    }
    get body() {
      return childElementNamed(this.documentElement, "body");
    }
    get title() {
      var title = this.querySelector("title");
      return title ? collectText(title).replace(/\s+/g, " ").trim() : "";
    }
    set title(value) {
      var title = this.querySelector("title");
      if (!title) {
        var head = this.head;
        if (!head) {
          return;
        }
        title = new Element("title");
        insertNodes(head, [title], null);
      }
      title.textContent = value;
    }
    get URL() {
      return globalThis.location.href;
    }
    get documentURI() {
      return globalThis.location.href;
    }
    get domain() {
      return globalThis.location.hostname;
    }
    get location() {
      return globalThis.location;
    }
    set location(value) {
      globalThis.location.href = value;
    }
    get defaultView() {
      return globalThis;
    }
    get activeElement() {
      return this.body;
    }
    get cookie() {
      var names = Object.keys(state.cookies);
      var out = [];
      for (var i = 0; i < names.length; i += 1) {
        out.push(names[i] + "=" + state.cookies[names[i]]);
      }
      return out.join("; ");
    }
    set cookie(input) {
      if (input == null) {
        return;
      }
      var first = String(input).trim().split(";")[0];
      var eq = first.indexOf("=");
      if (eq <= 0) {
        return;
      }
      var name = first.slice(0, eq).trim();
      if (name) {
        state.cookies[name] = first.slice(eq + 1).trim();
      }
    }
    get forms() {
      return this.getElementsByTagName("form");
    }
    get images() {
      return this.getElementsByTagName("img");
    }
    get scripts() {
      return this.getElementsByTagName("script");
    }
    get links() {
      return querySelectorAllFrom(this, "a[href], area[href]");
    }
    hasFocus() {
      return false;
    }
    createElement(name) {
      return new Element(name);
    }
    createElementNS(namespace, qualifiedName) {
      var element = new Element(String(qualifiedName).split(":").pop());
      element.namespaceURI = namespace == null ? null : String(namespace);
      return element;
    }
    createTextNode(data) {
      return new Text(data);
    }
    createComment(data) {
      return new Comment(data);
    }
    createDocumentFragment() {
      return new DocumentFragment();
    }
    createEvent(_kind) {
      return new Event("");
    }
    importNode(node, deep) {
      return cloneNode(node, !!deep);
    }
    adoptNode(node) {
      if (node.parentNode) {
        detach(node);
      }
      return node;
    }
    getElementById(id) {
      var key = String(id);
      var all = descendants(this);
      for (var i = 0; i < all.length; i += 1) {
        if (isElement(all[i]) && all[i].getAttribute("id") === key) {
          return all[i];
        }
      }
      return null;
    }
    getElementsByName(name) {
      var key = String(name);
      return descendants(this).filter(function (node) {
        return isElement(node) && node.getAttribute("name") === key;
      });
    }
    elementFromPoint() {
      return null;
    }
    execCommand() {
      return false;
    }
    open() {
      return this;
    }
    close() {}
    // Parse-time writes land right after the running script; later ones append to <body>.
    write() {
      var nodes = parseFragment(Array.prototype.join.call(arguments, ""));
      if (nodes.length === 0) {
        return;
      }
      var script = this.currentScript;
      if (script && script.parentNode) {
        var cursor = state.writeCursor;
        var anchor = cursor && cursor.parentNode === script.parentNode ? cursor : script;
        insertNodes(anchor.parentNode, nodes, anchor.nextSibling);
        state.writeCursor = nodes[nodes.length - 1];
        return;
      }
      var body = this.body;
      if (body) {
        insertNodes(body, nodes, null);
      }
    }
    writeln() {
      this.write(Array.prototype.join.call(arguments, "") + "\n");
    }
  }

  applyMixin(Element.prototype, parentNodeMixin);
  applyMixin(Document.prototype, parentNodeMixin);
  applyMixin(DocumentFragment.prototype, parentNodeMixin);
  applyMixin(Element.prototype, childNodeMixin);
  applyMixin(CharacterData.prototype, childNodeMixin);
  applyMixin(DocumentType.prototype, childNodeMixin);

  documentNode = new Document();

  // ---- window -------------------------------------------------------------

  function splitUrl(href) {
    var match = /^([a-zA-Z][a-zA-Z0-9+.\-]*:)(?:\/\/([^\/?#]*))?([^?#]*)(\?[^#]*)?(#.*)?$/.exec(href);
    if (!match) {
      return { protocol: "", host: "", pathname: href, search: "", hash: "" };
    }
    return {
      protocol: match[1].toLowerCase(),
      host: match[2] || "",
      pathname: match[3] || "",
      search: match[4] || "",
      hash: match[5] || ""
    };
  }

  var currentHref = String(globalThis.__pv_page_url || "about:srcdoc");
  var location = {
    get href() { return currentHref; },
    set href(value) { requestNavigation("location", value); },
    get protocol() { return splitUrl(currentHref).protocol; },
    get host() { return splitUrl(currentHref).host; },
    get hostname() { return splitUrl(currentHref).host.replace(/:\d+$/, ""); },
    get port() {
      var match = /:(\d+)$/.exec(splitUrl(currentHref).host);
      return match ? match[1] : "";
    },
    get pathname() { return splitUrl(currentHref).pathname; },
    get search() { return splitUrl(currentHref).search; },
    get hash() { return splitUrl(currentHref).hash; },
    set hash(value) {
      var text = String(value);
      var parts = currentHref.split("#");
      currentHref = parts[0] + (text ? (text.charAt(0) === "#" ? text : "#" + text) : "");
    },
    get origin() {
      var parts = splitUrl(currentHref);
      return parts.host ? parts.protocol + "//" + parts.host : "null";
    },
    assign: function (value) { requestNavigation("location", value); },
    replace: function (value) { requestNavigation("location", value); },
    reload: function () { requestNavigation("reload", currentHref); },
    toString: function () { return currentHref; }
  };

  globalThis.location = location;
  globalThis.history = {
    length: 1,
    state: null,
    scrollRestoration: "auto",
    pushState: function (value) { this.state = value; },
    replaceState: function (value) { this.state = value; },
    back: function () {},
    forward: function () {},
    go: function () {}
  };
  globalThis.open = function (url) {
    requestNavigation("window.open", url);
    return null;
  };
  globalThis.alert = function (message) {
    globalThis.__pv_console_push("info", "[dialog] " + String(message === undefined ? "" : message));
  };
  globalThis.confirm = function (message) {
    globalThis.alert(message);
    return false;
  };
  globalThis.prompt = function (message) {
    globalThis.alert(message);
    return null;
  };
  globalThis.getComputedStyle = function (element) {
    return element && element.style ? element.style : {};
  };
  globalThis.addEventListener = function (type, listener, options) {
    addListener(globalThis, type, listener, options);
  };
  globalThis.removeEventListener = function (type, listener, options) {
    removeListener(globalThis, type, listener, options);
  };
  globalThis.dispatchEvent = function (event) {
    return dispatch(globalThis, event);
  };
  globalThis.Image = function Image(width, height) {
    var image = documentNode.createElement("img");
    if (width !== undefined) {
      image.setAttribute("width", width);
    }
    if (height !== undefined) {
      image.setAttribute("height", height);
    }
    return image;
  };

  globalThis.document = documentNode;
  globalThis.EventTarget = EventTarget;
  globalThis.Event = Event;
  globalThis.CustomEvent = CustomEvent;
  globalThis.UIEvent = UIEvent;
  globalThis.MouseEvent = MouseEvent;
  globalThis.KeyboardEvent = KeyboardEvent;
  globalThis.MutationObserver = MutationObserver;
  globalThis.WebKitMutationObserver = MutationObserver;
  globalThis.Node = Node;
  globalThis.CharacterData = CharacterData;
  globalThis.Text = Text;
  globalThis.Comment = Comment;
  globalThis.DocumentType = DocumentType;
  globalThis.DocumentFragment = DocumentFragment;
  globalThis.Document = Document;
  globalThis.HTMLDocument = Document;
  globalThis.Element = Element;
  ["HTMLElement", "HTMLAnchorElement", "HTMLBodyElement", "HTMLButtonElement", "HTMLDivElement",
    "HTMLFormElement", "HTMLHeadElement", "HTMLHtmlElement", "HTMLIFrameElement", "HTMLImageElement",
    "HTMLInputElement", "HTMLLinkElement", "HTMLMetaElement", "HTMLParagraphElement",
    "HTMLScriptElement", "HTMLSpanElement", "HTMLStyleElement", "HTMLTemplateElement",
    "HTMLTextAreaElement", "HTMLUnknownElement", "SVGElement"].forEach(function (name) {
    globalThis[name] = Element;
  });

  // ---- host entry points --------------------------------------------------

  globalThis.__pv_load = function (snapshots) {
    replaceAllChildren(documentNode, []);
    for (var i = 0; i < snapshots.length; i += 1) {
      var node = build(snapshots[i]);
      if (node) {
        node.parentNode = documentNode;
        documentNode.childNodes.push(node);
      }
    }
    documentNode.readyState = "loading";
    state.version = 0;
    state.pending = [];
  };

  globalThis.__pv_export = function () {
    var out = [];
    for (var i = 0; i < documentNode.childNodes.length; i += 1) {
      var node = exportNode(documentNode.childNodes[i]);
      if (node) {
        out.push(node);
      }
    }
    return JSON.stringify(out);
  };

  globalThis.__pv_dom_version = function () {
    return state.version;
  };

  function isClassicScript(element) {
    var type = (element.getAttribute("type") || "").trim().toLowerCase();
    return type === "" || type === "text/javascript" || type === "application/javascript"
      || type === "text/ecmascript" || type === "application/ecmascript";
  }

  // Next connected script that has not started yet, in tree order.
  globalThis.__pv_next_script = function () {
    var all = descendants(documentNode);
    for (var i = 0; i < all.length; i += 1) {
      var node = all[i];
      if (!isElement(node) || node.localName !== "script" || node.__pvStarted) {
        continue;
      }
      markStarted(node);
      if (!isClassicScript(node)) {
        continue;
      }
      state.scriptCounter += 1;
      var src = node.getAttribute("src");
      documentNode.currentScript = node;
      state.writeCursor = null;
      return JSON.stringify({
        origin: src != null
          ? "src:" + src
          : (node.__pvMarker ? "helper:" : "inline:") + state.scriptCounter,
        source: src != null ? "" : collectText(node),
        external: src != null,
        helper: !!node.__pvMarker
      });
    }
    documentNode.currentScript = null;
    return "null";
  };

  globalThis.__pv_finish_script = function () {
    documentNode.currentScript = null;
    state.writeCursor = null;
  };

  globalThis.__pv_dispatch_lifecycle = function (name) {
    if (name === "DOMContentLoaded") {
      documentNode.readyState = "interactive";
      dispatch(documentNode, new Event("readystatechange"));
      dispatch(documentNode, new Event("DOMContentLoaded", { bubbles: true }));
    } else if (name === "load") {
      documentNode.readyState = "complete";
      dispatch(documentNode, new Event("readystatechange"));
      dispatch(globalThis, new Event("load"));
    }
  };

  globalThis.__pv_click = function (selector) {
    var target = documentNode.querySelector(String(selector));
    if (!target) {
      return false;
    }
    target.click();
    return true;
  };

  globalThis.__pv_submit = function (selector) {
    var target = documentNode.querySelector(String(selector));
    var form = target ? target.closest("form") : null;
    if (!form) {
      return false;
    }
    submitForm(form, null);
    return true;
  };

  globalThis.__pv_drain = function (name) {
    var list = globalThis[name];
    if (!Array.isArray(list)) {
      return "[]";
    }
    return JSON.stringify(list.splice(0, list.length));
  };
})();
"##;
